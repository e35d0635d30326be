//! Software binary BCH used by the simulated codec.
//!
//! Systematic encoding, data bits MSB first. The codeword polynomial puts
//! data bit 0 of byte 0 at the highest degree and the parity at degrees
//! `r-1..0`, packed MSB first into `ceil(r/8)` bytes.

use std::collections::BTreeSet;

/// Outcome of one decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Clean,
    /// (byte offset inside data+parity, bit 0..7 LSB numbering)
    Errors(Vec<(usize, u8)>),
    Uncorrectable,
}

pub struct Bch {
    /// GF(2^m)
    m: u32,
    /// 2^m - 1
    n: usize,
    t: usize,
    /// generator degree (parity bits)
    r: usize,
    /// generator without the x^r term
    gen_low: u128,
    exp: Vec<u16>,
    log: Vec<u16>,
}

fn primitive_poly(m: u32) -> u32 {
    match m {
        13 => 0x201b,
        14 => 0x402b,
        _ => panic!("unsupported field m={m}"),
    }
}

impl Bch {
    /// Code for `unit_size` data bytes correcting `t` bits
    pub fn new(unit_size: usize, t: usize) -> Self {
        let m = if unit_size <= 512 { 13 } else { 14 };
        let n = (1usize << m) - 1;
        let poly = primitive_poly(m);

        let mut exp = vec![0u16; n];
        let mut log = vec![0u16; n + 1];
        let mut x = 1u32;
        for (i, e) in exp.iter_mut().enumerate() {
            *e = x as u16;
            log[x as usize] = i as u16;
            x <<= 1;
            if x & (1 << m) != 0 {
                x ^= poly;
            }
        }

        let mut bch = Self {
            m,
            n,
            t,
            r: 0,
            gen_low: 0,
            exp,
            log,
        };

        // roots: union of the cyclotomic cosets of alpha^1..alpha^2t
        let mut roots = BTreeSet::new();
        for i in 1..=2 * t {
            let mut e = i % n;
            while roots.insert(e) {
                e = (e * 2) % n;
            }
        }
        let mut gen = vec![1u16];
        for &e in &roots {
            let a = bch.exp[e];
            let mut next = vec![0u16; gen.len() + 1];
            for (i, &c) in gen.iter().enumerate() {
                next[i + 1] ^= c;
                next[i] ^= bch.mul(c, a);
            }
            gen = next;
        }
        let r = gen.len() - 1;
        assert!(r <= 128, "parity does not fit the register");
        let mut gen_low = 0u128;
        for (i, &c) in gen.iter().enumerate().take(r) {
            assert!(c <= 1, "generator not binary");
            gen_low |= (c as u128) << i;
        }
        bch.r = r;
        bch.gen_low = gen_low;
        bch
    }

    pub fn parity_bits(&self) -> usize {
        self.r
    }

    pub fn parity_bytes(&self) -> usize {
        self.r.div_ceil(8)
    }

    pub fn field_bits(&self) -> u32 {
        self.m
    }

    fn mul(&self, a: u16, b: u16) -> u16 {
        if a == 0 || b == 0 {
            return 0;
        }
        let l = self.log[a as usize] as usize + self.log[b as usize] as usize;
        self.exp[l % self.n]
    }

    fn div(&self, a: u16, b: u16) -> u16 {
        if a == 0 {
            return 0;
        }
        let l = self.log[a as usize] as usize + self.n - self.log[b as usize] as usize;
        self.exp[l % self.n]
    }

    fn pow(&self, e: usize) -> u16 {
        self.exp[e % self.n]
    }

    fn mask(&self) -> u128 {
        if self.r == 128 {
            u128::MAX
        } else {
            (1u128 << self.r) - 1
        }
    }

    pub fn encode(&self, data: &[u8]) -> Vec<u8> {
        let mut rem = 0u128;
        for byte in data {
            for bit in (0..8).rev() {
                let feedback = ((byte >> bit) & 1) as u128 ^ ((rem >> (self.r - 1)) & 1);
                rem = (rem << 1) & self.mask();
                if feedback != 0 {
                    rem ^= self.gen_low;
                }
            }
        }
        let mut parity = vec![0u8; self.parity_bytes()];
        for q in 0..self.r {
            if (rem >> (self.r - 1 - q)) & 1 != 0 {
                parity[q / 8] |= 0x80 >> (q % 8);
            }
        }
        parity
    }

    /// Degree of the codeword coefficient for a bit of data+parity
    fn degree(&self, data_len: usize, byte: usize, bit: u8) -> Option<usize> {
        let k = data_len * 8;
        // MSB first stream position
        let pos = byte * 8 + (7 - bit as usize);
        if pos < k {
            Some(self.r + k - 1 - pos)
        } else if pos - k < self.r {
            Some(self.r - 1 - (pos - k))
        } else {
            // padding bits of the last parity byte
            None
        }
    }

    pub fn decode(&self, data: &[u8], parity: &[u8]) -> Decoded {
        let k = data.len() * 8;
        let mut syndromes = vec![0u16; 2 * self.t];
        let bytes = data.iter().chain(parity.iter()).enumerate();
        for (byte, value) in bytes {
            for bit in 0..8u8 {
                if (value >> bit) & 1 == 0 {
                    continue;
                }
                if let Some(deg) = self.degree(data.len(), byte, bit) {
                    for (i, s) in syndromes.iter_mut().enumerate() {
                        *s ^= self.pow((i + 1) * deg);
                    }
                }
            }
        }
        if syndromes.iter().all(|s| *s == 0) {
            return Decoded::Clean;
        }

        // Berlekamp-Massey
        let mut c = vec![1u16];
        let mut b = vec![1u16];
        let mut l = 0usize;
        let mut shift = 1usize;
        let mut last = 1u16;
        for i in 0..2 * self.t {
            let mut d = syndromes[i];
            for j in 1..=l.min(c.len() - 1) {
                d ^= self.mul(c[j], syndromes[i - j]);
            }
            if d == 0 {
                shift += 1;
                continue;
            }
            let coef = self.div(d, last);
            let mut next = c.clone();
            if next.len() < b.len() + shift {
                next.resize(b.len() + shift, 0);
            }
            for (j, &bj) in b.iter().enumerate() {
                next[j + shift] ^= self.mul(coef, bj);
            }
            if 2 * l <= i {
                b = c;
                l = i + 1 - l;
                last = d;
                shift = 1;
            } else {
                shift += 1;
            }
            c = next;
        }
        if l > self.t {
            return Decoded::Uncorrectable;
        }

        // Chien search over every codeword position
        let mut errors = Vec::new();
        for deg in 0..self.r + k {
            let inv = (self.n - deg % self.n) % self.n;
            let mut sum = 0u16;
            for (j, &cj) in c.iter().enumerate().take(l + 1) {
                sum ^= self.mul(cj, self.pow(inv * j));
            }
            if sum == 0 {
                let pos = if deg >= self.r {
                    self.r + k - 1 - deg
                } else {
                    k + (self.r - 1 - deg)
                };
                errors.push((pos / 8, 7 - (pos % 8) as u8));
            }
        }
        if errors.len() != l {
            return Decoded::Uncorrectable;
        }
        Decoded::Errors(errors)
    }
}
