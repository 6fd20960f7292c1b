use super::*;
use std::collections::HashMap;

/// Deterministic policy backed by a lookup table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabularPolicy {
    actions: HashMap<Cell, Action>,
}

impl TabularPolicy {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn insert(&mut self, cell: Cell, action: Action) -> Option<Action> {
        self.actions.insert(cell, action)
    }

    pub fn get(&self, cell: &Cell) -> Option<Action> {
        self.actions.get(cell).copied()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Cell, &Action)> {
        self.actions.iter()
    }

    /// Entries ordered by cell, for stable output.
    pub fn to_sorted_vec(&self) -> Vec<(Cell, Action)> {
        let mut entries = self.actions.iter().map(|(c, a)| (*c, *a)).collect::<Vec<_>>();
        entries.sort();
        entries
    }
}

impl FromIterator<(Cell, Action)> for TabularPolicy {
    fn from_iter<I: IntoIterator<Item = (Cell, Action)>>(iter: I) -> Self {
        Self {
            actions: iter.into_iter().collect(),
        }
    }
}

impl Policy<Cell, Action> for TabularPolicy {
    fn policy(&self, s: &Cell) -> Option<Action> {
        self.get(s)
    }
}

/// Moves the same way from every cell.
#[derive(Debug, Clone, Copy)]
pub struct ConstantPolicy(pub Action);

impl Policy<Cell, Action> for ConstantPolicy {
    fn policy(&self, _s: &Cell) -> Option<Action> {
        Some(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabular_policy_lookups() {
        let pi = [(Cell::new(1, 0), Action::N), (Cell::new(0, 0), Action::E)]
            .into_iter()
            .collect::<TabularPolicy>();

        assert_eq!(pi.policy(&Cell::new(0, 0)), Some(Action::E));
        assert_eq!(pi.policy(&Cell::new(5, 5)), None);
        assert_eq!(
            pi.to_sorted_vec(),
            vec![(Cell::new(0, 0), Action::E), (Cell::new(1, 0), Action::N)]
        );
    }
}
