//! # Reed-Solomon Decoder
//!
//! Error correction over GF(256) with generator base exponent 0, as QR codes
//! use it. The decoder runs the classic pipeline: syndrome computation,
//! extended Euclidean algorithm for the error locator and evaluator, Chien
//! search for the error positions, and Forney's formula for the magnitudes.
//!
//! A systematic encoder lives here too; the round-trip property tests lean on
//! it, and it is the counterpart a caller needs to build self-checking
//! fixtures.

use super::gf256;
use super::poly::GfPoly;
use crate::error::{LectoraError, RsKind};

/// Correct up to `two_s / 2` symbol errors in place.
///
/// `received` holds data followed by `two_s` error-correction codewords.
/// Returns the number of corrected symbols. Uncorrectable blocks fail with a
/// [`LectoraError::ReedSolomon`] and never silently return wrong data.
pub fn decode(received: &mut [u8], two_s: usize) -> Result<usize, LectoraError> {
    debug_assert!(two_s > 0 && two_s < received.len());

    let poly = GfPoly::new(received.to_vec());
    let mut syndromes = vec![0u8; two_s];
    let mut no_error = true;
    for (i, syndrome) in syndromes.iter_mut().enumerate() {
        *syndrome = poly.evaluate(gf256::exp(i));
        if *syndrome != 0 {
            no_error = false;
        }
    }
    if no_error {
        return Ok(0);
    }

    // Syndrome polynomial, highest-order syndrome first.
    syndromes.reverse();
    let syndrome_poly = GfPoly::new(syndromes);

    let (sigma, omega) =
        run_euclidean(&GfPoly::monomial(two_s, 1), &syndrome_poly, two_s)?;
    let locations = find_error_locations(&sigma)?;
    let magnitudes = find_error_magnitudes(&omega, &locations);

    let mut corrected = 0;
    for (&location, &magnitude) in locations.iter().zip(&magnitudes) {
        let log = gf256::log(location);
        if log + 1 > received.len() {
            return Err(LectoraError::ReedSolomon(RsKind::BadErrorPosition));
        }
        let position = received.len() - 1 - log;
        received[position] ^= magnitude;
        corrected += 1;
    }
    Ok(corrected)
}

/// Extended Euclidean algorithm on a = x^two_s and b = S(x), stopping when
/// the remainder degree drops below two_s / 2. Yields the error locator
/// sigma and evaluator omega, both normalised by sigma(0).
fn run_euclidean(
    a: &GfPoly,
    b: &GfPoly,
    two_s: usize,
) -> Result<(GfPoly, GfPoly), LectoraError> {
    let (mut r_last, mut r) = if a.degree() < b.degree() {
        (b.clone(), a.clone())
    } else {
        (a.clone(), b.clone())
    };
    let mut t_last = GfPoly::zero();
    let mut t = GfPoly::monomial(0, 1);

    while 2 * r.degree() >= two_s {
        let r_last_last = r_last;
        let t_last_last = t_last;
        r_last = r;
        t_last = t;

        if r_last.is_zero() {
            // The syndromes were all zero after all; callers filter that
            // case, so this is corrupt data.
            return Err(LectoraError::ReedSolomon(RsKind::TooManyErrors));
        }

        r = r_last_last;
        let mut q = GfPoly::zero();
        let denominator_lead_inverse =
            gf256::inverse(r_last.coefficient(r_last.degree()));
        while !r.is_zero() && r.degree() >= r_last.degree() {
            let degree_diff = r.degree() - r_last.degree();
            let scale =
                gf256::multiply(r.coefficient(r.degree()), denominator_lead_inverse);
            q = q.add(&GfPoly::monomial(degree_diff, scale));
            r = r.add(&r_last.multiply_by_monomial(degree_diff, scale));
        }

        t = q.multiply(&t_last).add(&t_last_last);

        if !r.is_zero() && r.degree() >= r_last.degree() {
            return Err(LectoraError::ReedSolomon(RsKind::TooManyErrors));
        }
    }

    let sigma_tilde_at_zero = t.coefficient(0);
    if sigma_tilde_at_zero == 0 {
        return Err(LectoraError::ReedSolomon(RsKind::TooManyErrors));
    }
    let inverse = gf256::inverse(sigma_tilde_at_zero);
    Ok((t.multiply_scalar(inverse), r.multiply_scalar(inverse)))
}

/// Chien search: the roots of sigma are the inverses of the error locators.
/// Their count must equal the locator degree or correction has failed.
fn find_error_locations(sigma: &GfPoly) -> Result<Vec<u8>, LectoraError> {
    let num_errors = sigma.degree();
    if num_errors == 1 {
        return Ok(vec![sigma.coefficient(1)]);
    }
    let mut locations = Vec::with_capacity(num_errors);
    for i in 1..=255u16 {
        if sigma.evaluate(i as u8) == 0 {
            locations.push(gf256::inverse(i as u8));
            if locations.len() == num_errors {
                break;
            }
        }
    }
    if locations.len() != num_errors {
        return Err(LectoraError::ReedSolomon(RsKind::LocatorDegreeMismatch));
    }
    Ok(locations)
}

/// Forney's formula with generator base 0.
fn find_error_magnitudes(omega: &GfPoly, locations: &[u8]) -> Vec<u8> {
    locations
        .iter()
        .map(|&xi| {
            let xi_inverse = gf256::inverse(xi);
            let mut denominator = 1u8;
            for &xj in locations {
                if xj != xi {
                    denominator = gf256::multiply(
                        denominator,
                        gf256::add(1, gf256::multiply(xj, xi_inverse)),
                    );
                }
            }
            gf256::multiply(omega.evaluate(xi_inverse), gf256::inverse(denominator))
        })
        .collect()
}

/// Systematic Reed-Solomon encoder: returns the `ec_len` error-correction
/// codewords for `data`.
pub fn encode(data: &[u8], ec_len: usize) -> Vec<u8> {
    debug_assert!(ec_len > 0);
    let mut generator = GfPoly::monomial(0, 1);
    for i in 0..ec_len {
        generator = generator.multiply(&GfPoly::new(vec![1, gf256::exp(i)]));
    }
    let message = GfPoly::new(data.to_vec()).multiply_by_monomial(ec_len, 1);
    let (_, remainder) = message.divide(&generator);
    let mut ec = vec![0u8; ec_len];
    for i in 0..ec_len {
        ec[ec_len - 1 - i] = remainder.coefficient(i);
    }
    ec
}

// ============================================================================
// TESTS
// ============================================================================
