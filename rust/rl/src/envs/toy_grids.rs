#[cfg(test)]
use gridworld::{CellType::*, *};
#[cfg(test)]
use ndarray::array;

/// 2x2, goal in the north-east corner.
#[cfg(test)]
pub fn two_by_two() -> GridWorld {
    GridWorld::new(
        array![[Accessible, Accessible], [Accessible, Terminal]],
        array![[-0.04, -0.04], [-0.04, 1.]],
        KernelModel::deterministic(),
    )
    .unwrap()
}

/// Russell & Norvig's 4x3 world with the rows stored south first.
#[cfg(test)]
pub fn four_by_three(kernel: KernelModel) -> GridWorld {
    GridWorld::new(
        array![
            [Accessible, Accessible, Accessible, Accessible],
            [Accessible, Inaccessible, Accessible, Terminal],
            [Accessible, Accessible, Accessible, Terminal],
        ],
        array![
            [-0.04, -0.04, -0.04, -0.04],
            [-0.04, 0., -0.04, -1.],
            [-0.04, -0.04, -0.04, 1.],
        ],
        kernel,
    )
    .unwrap()
}

/// A corridor whose only exit west is a wall.
#[cfg(test)]
pub fn corridor() -> GridWorld {
    GridWorld::new(
        array![[Inaccessible, Accessible, Accessible, Terminal]],
        array![[0., -1., -1., 10.]],
        KernelModel::deterministic(),
    )
    .unwrap()
}
