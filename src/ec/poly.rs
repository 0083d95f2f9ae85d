//! # Polynomials over GF(256)
//!
//! Coefficients are stored highest degree first and leading zeros are
//! stripped on construction, so the zero polynomial is exactly `[0]`.

use super::gf256;

/// Owning polynomial value over GF(256).
#[derive(Clone, PartialEq, Eq)]
pub struct GfPoly {
    coefficients: Vec<u8>,
}

impl GfPoly {
    pub fn new(coefficients: Vec<u8>) -> Self {
        debug_assert!(!coefficients.is_empty());
        let first_nonzero = coefficients.iter().position(|&c| c != 0);
        match first_nonzero {
            None => GfPoly { coefficients: vec![0] },
            Some(0) => GfPoly { coefficients },
            Some(n) => GfPoly { coefficients: coefficients[n..].to_vec() },
        }
    }

    pub fn zero() -> Self {
        GfPoly { coefficients: vec![0] }
    }

    /// coefficient * x^degree
    pub fn monomial(degree: usize, coefficient: u8) -> Self {
        if coefficient == 0 {
            return Self::zero();
        }
        let mut coefficients = vec![0; degree + 1];
        coefficients[0] = coefficient;
        GfPoly { coefficients }
    }

    pub fn is_zero(&self) -> bool {
        self.coefficients[0] == 0
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Coefficient of the x^degree term (0 when above this degree).
    pub fn coefficient(&self, degree: usize) -> u8 {
        if degree > self.degree() {
            return 0;
        }
        self.coefficients[self.coefficients.len() - 1 - degree]
    }

    /// Horner evaluation at `x`.
    pub fn evaluate(&self, x: u8) -> u8 {
        if x == 0 {
            return self.coefficient(0);
        }
        if x == 1 {
            return self.coefficients.iter().fold(0, |acc, &c| gf256::add(acc, c));
        }
        self.coefficients
            .iter()
            .fold(0, |acc, &c| gf256::add(gf256::multiply(acc, x), c))
    }

    /// Addition (== subtraction): XOR over the aligned high-order ends.
    pub fn add(&self, other: &GfPoly) -> GfPoly {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        let (smaller, larger) = if self.coefficients.len() <= other.coefficients.len() {
            (&self.coefficients, &other.coefficients)
        } else {
            (&other.coefficients, &self.coefficients)
        };
        let diff = larger.len() - smaller.len();
        let mut sum = larger.clone();
        for (i, &c) in smaller.iter().enumerate() {
            sum[diff + i] ^= c;
        }
        GfPoly::new(sum)
    }

    pub fn multiply(&self, other: &GfPoly) -> GfPoly {
        if self.is_zero() || other.is_zero() {
            return GfPoly::zero();
        }
        let a = &self.coefficients;
        let b = &other.coefficients;
        let mut product = vec![0u8; a.len() + b.len() - 1];
        for (i, &ac) in a.iter().enumerate() {
            if ac == 0 {
                continue;
            }
            for (j, &bc) in b.iter().enumerate() {
                product[i + j] ^= gf256::multiply(ac, bc);
            }
        }
        GfPoly::new(product)
    }

    pub fn multiply_scalar(&self, scalar: u8) -> GfPoly {
        match scalar {
            0 => GfPoly::zero(),
            1 => self.clone(),
            _ => GfPoly::new(
                self.coefficients
                    .iter()
                    .map(|&c| gf256::multiply(c, scalar))
                    .collect(),
            ),
        }
    }

    /// self * coefficient * x^degree
    pub fn multiply_by_monomial(&self, degree: usize, coefficient: u8) -> GfPoly {
        if coefficient == 0 || self.is_zero() {
            return GfPoly::zero();
        }
        let mut product: Vec<u8> = self
            .coefficients
            .iter()
            .map(|&c| gf256::multiply(c, coefficient))
            .collect();
        product.extend(std::iter::repeat_n(0, degree));
        GfPoly::new(product)
    }

    /// Long division; returns (quotient, remainder). The divisor must be
    /// non-zero.
    pub fn divide(&self, other: &GfPoly) -> (GfPoly, GfPoly) {
        assert!(!other.is_zero(), "division by the zero polynomial");
        let mut quotient = GfPoly::zero();
        let mut remainder = self.clone();

        let denominator_lead = other.coefficient(other.degree());
        let inverse_lead = gf256::inverse(denominator_lead);

        while !remainder.is_zero() && remainder.degree() >= other.degree() {
            let degree_diff = remainder.degree() - other.degree();
            let scale = gf256::multiply(remainder.coefficient(remainder.degree()), inverse_lead);
            let term = GfPoly::monomial(degree_diff, scale);
            quotient = quotient.add(&term);
            remainder = remainder.add(&other.multiply_by_monomial(degree_diff, scale));
        }
        (quotient, remainder)
    }
}

impl std::fmt::Debug for GfPoly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GfPoly{:02X?}", self.coefficients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_zeros_stripped() {
        let p = GfPoly::new(vec![0, 0, 3, 7]);
        assert_eq!(p.degree(), 1);
        assert_eq!(p.coefficient(1), 3);
        assert_eq!(p.coefficient(0), 7);
        assert_eq!(p.coefficient(5), 0);
        assert!(GfPoly::new(vec![0, 0, 0]).is_zero());
    }

    #[test]
    fn test_evaluate() {
        // p(x) = 2x^2 + 3x + 5 at x = 4: 2*16... in GF: 2*(4*4) ^ 3*4 ^ 5
        let p = GfPoly::new(vec![2, 3, 5]);
        let x = 4u8;
        let expected = gf256::multiply(2, gf256::multiply(x, x))
            ^ gf256::multiply(3, x)
            ^ 5;
        assert_eq!(p.evaluate(x), expected);
        assert_eq!(p.evaluate(0), 5);
        assert_eq!(p.evaluate(1), 2 ^ 3 ^ 5);
    }

    #[test]
    fn test_add_is_xor_aligned_low() {
        let a = GfPoly::new(vec![1, 2, 3]);
        let b = GfPoly::new(vec![5, 6]);
        let sum = a.add(&b);
        assert_eq!(sum.coefficient(2), 1);
        assert_eq!(sum.coefficient(1), 2 ^ 5);
        assert_eq!(sum.coefficient(0), 3 ^ 6);
        // Self-cancellation yields zero.
        assert!(a.add(&a).is_zero());
    }

    #[test]
    fn test_multiply_by_monomial() {
        let p = GfPoly::new(vec![1, 1]);
        let shifted = p.multiply_by_monomial(2, 1);
        assert_eq!(shifted.degree(), 3);
        assert_eq!(shifted.coefficient(0), 0);
        assert_eq!(shifted.coefficient(2), 1);
        assert_eq!(shifted.coefficient(3), 1);
    }

    #[test]
    fn test_divide_round_trips() {
        // (q * d) + r == p for a few polynomials.
        let p = GfPoly::new(vec![8, 1, 44, 7, 9]);
        let d = GfPoly::new(vec![3, 0, 5]);
        let (q, r) = p.divide(&d);
        assert!(r.is_zero() || r.degree() < d.degree());
        assert_eq!(q.multiply(&d).add(&r), p);
    }

    #[test]
    fn test_divide_exact() {
        let d = GfPoly::new(vec![1, 7]);
        let q = GfPoly::new(vec![9, 2, 1]);
        let p = d.multiply(&q);
        let (q2, r) = p.divide(&d);
        assert_eq!(q2, q);
        assert!(r.is_zero());
    }
}
