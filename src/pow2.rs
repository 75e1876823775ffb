use num_bigint::BigInt;

/// Number of precomputed powers of two.
///
/// Display arithmetic rarely climbs past this; levels beyond the table are
/// served by doubling from the last entry.
pub const LEVEL_MAX: u32 = 68;

/// Cache of arbitrary-precision powers of two for display-coordinate
/// arithmetic.
pub struct Pow2Table {
    table: Vec<BigInt>,
}

impl Pow2Table {
    pub fn new() -> Self {
        let mut table = Vec::with_capacity(LEVEL_MAX as usize);
        table.push(BigInt::from(1));
        for i in 1..LEVEL_MAX as usize {
            let doubled = &table[i - 1] + &table[i - 1];
            table.push(doubled);
        }

        Self { table }
    }

    /// `2^exp`.
    pub fn get(&self, exp: u32) -> BigInt {
        match self.table.get(exp as usize) {
            Some(pow) => pow.clone(),
            None => {
                let mut pow = self.table[self.table.len() - 1].clone();
                for _ in self.table.len()..=exp as usize {
                    pow = &pow + &pow;
                }
                pow
            }
        }
    }
}

impl Default for Pow2Table {
    fn default() -> Self {
        Self::new()
    }
}
