//! Plain text views of a [`GridWorld`] and of what the solvers produce.
//!
//! Rows are printed north first, so `y = rows - 1` is the top line.

use crate::*;
use itertools::Itertools;
use std::collections::HashSet;

const WALL: char = '#';
const GOAL: char = 'T';

fn render_rows<F>(world: &GridWorld, sep: &str, mut cell: F) -> String
where
    F: FnMut(Cell, CellType) -> String,
{
    (0..world.rows() as Discrete)
        .rev()
        .map(|y| {
            (0..world.cols() as Discrete)
                .map(|x| {
                    let c = Cell::new(x, y);
                    let ty = world.cell_type(c).unwrap_or(CellType::Inaccessible);
                    cell(c, ty)
                })
                .join(sep)
        })
        .join("\n")
}

pub fn render_types(world: &GridWorld) -> String {
    render_rows(world, "", |_, ty| {
        match ty {
            CellType::Inaccessible => WALL,
            CellType::Accessible => '.',
            CellType::Terminal => GOAL,
        }
        .to_string()
    })
}

pub fn render_rewards(world: &GridWorld) -> String {
    render_rows(world, " ", |c, _| {
        format!("{:>7.2}", world.reward_of(c).unwrap_or_default())
    })
}

pub fn render_values(world: &GridWorld, values: &ValueFunction) -> String {
    render_rows(world, " ", |c, ty| match (ty, values.get(&c)) {
        (CellType::Inaccessible, _) | (_, None) => format!("{WALL:>8}"),
        (_, Some(v)) => format!("{v:>8.3}"),
    })
}

pub fn render_policy<P: Policy<Cell, Action> + ?Sized>(world: &GridWorld, policy: &P) -> String {
    render_rows(world, " ", |c, ty| {
        match ty {
            CellType::Inaccessible => WALL,
            CellType::Terminal => GOAL,
            CellType::Accessible => policy.policy(&c).map_or('?', |a| a.arrow()),
        }
        .to_string()
    })
}

/// Marks the start with `S` and every later visited cell with `*`.
pub fn render_trajectory(world: &GridWorld, cells: &[Cell]) -> String {
    let visited = cells.iter().skip(1).collect::<HashSet<_>>();
    render_rows(world, "", |c, ty| {
        if cells.first() == Some(&c) {
            'S'
        } else if visited.contains(&c) {
            '*'
        } else {
            match ty {
                CellType::Inaccessible => WALL,
                CellType::Accessible => '.',
                CellType::Terminal => GOAL,
            }
        }
        .to_string()
    })
}
