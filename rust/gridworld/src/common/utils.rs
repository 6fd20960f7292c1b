use super::defs::Continous;

/// Tolerance used when checking that probabilities sum to one.
pub const PROBABILITY_TOLERANCE: Continous = 1e-6;

pub fn sums_to_one<'a, I>(ps: I) -> bool
where
    I: IntoIterator<Item = &'a Continous>,
{
    let total: Continous = ps.into_iter().sum();
    (total - 1.).abs() <= PROBABILITY_TOLERANCE
}

/// First item with the largest key. Later items only win when strictly larger.
pub fn argmax_first<T, I, F>(items: I, mut key: F) -> Option<(T, Continous)>
where
    I: IntoIterator<Item = T>,
    F: FnMut(&T) -> Continous,
{
    let mut best: Option<(T, Continous)> = None;
    for item in items {
        let k = key(&item);
        match best {
            Some((_, b)) if k <= b => {}
            _ => best = Some((item, k)),
        }
    }

    best
}
