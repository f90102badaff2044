//! Bit-parallel candidate pruning
//!
//! [`Eliminator`] computes the Levenshtein distance between one fixed pattern
//! and many texts with the Myers/Hyyrö bit-vector automaton, then keeps the
//! k closest texts. Patterns longer than one machine word are split into
//! 64-bit blocks and the horizontal carry is propagated between blocks, so a
//! text costs `O(len × ⌈pattern / 64⌉)` word operations and no allocation
//! beyond the scratch blocks reused across texts.
//!
//! # Example
//!
//! ```rust
//! use resembla_core::Eliminator;
//!
//! let mut eliminator = Eliminator::new("resembla");
//! assert_eq!(eliminator.distance("resemble"), 1);
//!
//! let mut candidates = vec!["assemble", "resemble", "nothing", "resembla"];
//! eliminator.eliminate(&mut candidates, 2);
//! assert_eq!(candidates, vec!["resemble", "resembla"]);
//! ```

use ahash::AHashMap;

const BLOCK_BITS: usize = u64::BITS as usize;
const MSB: u64 = 1 << (BLOCK_BITS - 1);

/// Per-block automaton state for the current text column
#[derive(Debug, Clone, Copy, Default)]
struct WorkData {
    d0: u64,
    hp: u64,
    hn: u64,
    vp: u64,
    vn: u64,
}

/// Edit-distance automaton for one fixed pattern
#[derive(Debug, Clone)]
pub struct Eliminator {
    pattern_length: usize,
    /// Per-symbol masks of pattern positions, one word per block
    pm: AHashMap<char, Vec<u64>>,
    zeroes: Vec<u64>,
    /// Bit of the last pattern position within the last block
    sink: u64,
    /// Initial vertical-positive vector of the last block
    vp0: u64,
    work: Vec<WorkData>,
}

impl Eliminator {
    pub fn new(pattern: &str) -> Self {
        let symbols: Vec<char> = pattern.chars().collect();
        let pattern_length = symbols.len();
        let block_size = pattern_length.div_ceil(BLOCK_BITS);

        let mut pm: AHashMap<char, Vec<u64>> = AHashMap::new();
        for (i, &c) in symbols.iter().enumerate() {
            pm.entry(c).or_insert_with(|| vec![0; block_size])[i / BLOCK_BITS] |=
                1 << (i % BLOCK_BITS);
        }

        let (sink, vp0) = match pattern_length {
            0 => (0, 0),
            len => {
                let rest_bits = len - (block_size - 1) * BLOCK_BITS;
                let vp0 = if rest_bits == BLOCK_BITS {
                    !0
                } else {
                    (1 << rest_bits) - 1
                };
                (1 << (rest_bits - 1), vp0)
            }
        };

        Self {
            pattern_length,
            pm,
            zeroes: vec![0; block_size],
            sink,
            vp0,
            work: vec![WorkData::default(); block_size],
        }
    }

    /// Levenshtein distance between the pattern and `text`
    pub fn distance(&mut self, text: &str) -> usize {
        match self.work.len() {
            0 => text.chars().count(),
            1 => self.distance_single_block(text),
            _ => self.distance_multi_block(text),
        }
    }

    fn distance_single_block(&self, text: &str) -> usize {
        let mut d = self.pattern_length;
        let mut vp = self.vp0;
        let mut vn = 0u64;
        for c in text.chars() {
            let x = self.pm.get(&c).map_or(0, |bits| bits[0]) | vn;
            let d0 = ((vp.wrapping_add(x & vp)) ^ vp) | x;
            let hp = vn | !(vp | d0);
            let hn = vp & d0;
            if hp & self.sink != 0 {
                d += 1;
            } else if hn & self.sink != 0 {
                d -= 1;
            }
            let x = (hp << 1) | 1;
            vp = (hn << 1) | !(x | d0);
            vn = x & d0;
        }
        d
    }

    fn distance_multi_block(&mut self, text: &str) -> usize {
        let last = self.work.len() - 1;
        for w in self.work.iter_mut() {
            *w = WorkData {
                vp: !0,
                ..WorkData::default()
            };
        }
        self.work[last].vp = self.vp0;

        let mut d = self.pattern_length;
        for c in text.chars() {
            let bits = self.pm.get(&c).unwrap_or(&self.zeroes);
            for r in 0..=last {
                // horizontal delta entering this block from the one above
                let (carry_p, carry_n) = if r == 0 {
                    (true, false)
                } else {
                    let above = &self.work[r - 1];
                    (above.hp & MSB != 0, above.hn & MSB != 0)
                };

                let w = &mut self.work[r];
                let mut x = bits[r];
                if carry_n {
                    x |= 1;
                }
                w.d0 = ((w.vp.wrapping_add(x & w.vp)) ^ w.vp) | x | w.vn;
                w.hp = w.vn | !(w.vp | w.d0);
                w.hn = w.vp & w.d0;

                let mut x = w.hp << 1;
                if carry_p {
                    x |= 1;
                }
                w.vp = (w.hn << 1) | !(x | w.d0);
                if carry_n {
                    w.vp |= 1;
                }
                w.vn = x & w.d0;
            }

            let tail = &self.work[last];
            if tail.hp & self.sink != 0 {
                d += 1;
            } else if tail.hn & self.sink != 0 {
                d -= 1;
            }
        }
        d
    }

    /// Keep only the `k` candidates closest to the pattern
    ///
    /// Ties are broken by input position and survivors keep their input
    /// order. Nothing is removed when `k >= candidates.len()`.
    pub fn eliminate<S: AsRef<str>>(&mut self, candidates: &mut Vec<S>, k: usize) {
        if k >= candidates.len() {
            return;
        }
        if k == 0 {
            candidates.clear();
            return;
        }

        let mut ranked: Vec<(usize, usize)> = candidates
            .iter()
            .enumerate()
            .map(|(i, text)| (self.distance(text.as_ref()), i))
            .collect();
        ranked.select_nth_unstable(k - 1);

        let mut keep = vec![false; candidates.len()];
        for &(_, i) in &ranked[..k] {
            keep[i] = true;
        }
        let mut position = 0;
        candidates.retain(|_| {
            let kept = keep[position];
            position += 1;
            kept
        });
    }
}
