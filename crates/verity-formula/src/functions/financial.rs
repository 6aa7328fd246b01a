//! Financial functions
//!
//! The formula-level generators lower FV/PV/NPV/PMT/RATE/IRR to per-row
//! [`Expr::Financial`] calls; the routine set below does the actual math
//! on scalars and numeric sequences. Conventions follow the standard
//! end-of-period cash-flow model: closed forms where they exist, Newton
//! iteration (NaN on non-convergence) for RATE and IRR.

use verity_core::Scalar;

use super::{at_least, between, FunctionLibrary};
use crate::expr::{Expr, FinOp};

pub(crate) fn register(library: &mut FunctionLibrary) {
    register_padded(library, "FV", FinOp::Fv);
    register_padded(library, "PV", FinOp::Pv);
    register_padded(library, "PMT", FinOp::Pmt);
    register_padded(library, "RATE", FinOp::Rate);

    // NPV(rate, sequence) or NPV(rate, v1, v2, ...): the cash flows are a
    // declared sequence, not plain scalar arguments
    library
        .register_generator("NPV", |mut args| {
            at_least("NPV", &args, 2)?;
            let sequence = if args.len() == 2 {
                args.pop().expect("arity checked")
            } else {
                Expr::ListOf(args.split_off(1))
            };
            let rate = args.pop().expect("arity checked");
            Ok(Expr::Financial {
                op: FinOp::Npv,
                args: vec![rate, sequence],
            })
        })
        .expect("builtin");

    library
        .register_generator("IRR", |mut args| {
            at_least("IRR", &args, 1)?;
            let sequence = if args.len() == 1 {
                args.pop().expect("arity checked")
            } else {
                Expr::ListOf(args)
            };
            Ok(Expr::Financial {
                op: FinOp::Irr,
                args: vec![sequence],
            })
        })
        .expect("builtin");
}

/// FV/PV/PMT/RATE take three mandatory arguments; the fourth defaults
/// to zero
fn register_padded(library: &mut FunctionLibrary, name: &'static str, op: FinOp) {
    library
        .register_generator(name, move |mut args| {
            between(name, &args, 3, 4)?;
            while args.len() < 4 {
                args.push(Expr::Literal(Scalar::Int(0)));
            }
            Ok(Expr::Financial { op, args })
        })
        .expect("builtin");
}

// === Financial-math routine set ===

const RATE_MAX_ITER: usize = 100;
const RATE_TOL: f64 = 1e-6;

/// Future value of an investment
pub fn fv(rate: f64, nper: f64, pmt: f64, pv: f64) -> f64 {
    if rate == 0.0 {
        return -(pv + pmt * nper);
    }
    let factor = (1.0 + rate).powf(nper);
    -(pv * factor + pmt * (factor - 1.0) / rate)
}

/// Present value of an investment
pub fn pv(rate: f64, nper: f64, pmt: f64, fv: f64) -> f64 {
    if rate == 0.0 {
        return -(fv + pmt * nper);
    }
    let factor = (1.0 + rate).powf(nper);
    -(fv + pmt * (factor - 1.0) / rate) / factor
}

/// Periodic payment against a loan
pub fn pmt(rate: f64, nper: f64, pv: f64, fv: f64) -> f64 {
    if nper == 0.0 {
        return f64::NAN;
    }
    if rate == 0.0 {
        return -(fv + pv) / nper;
    }
    let factor = (1.0 + rate).powf(nper);
    -(fv + pv * factor) * rate / (factor - 1.0)
}

/// Net present value of a cash-flow sequence, first flow at period zero
pub fn npv(rate: f64, values: &[f64]) -> f64 {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| v / (1.0 + rate).powi(i as i32))
        .sum()
}

/// Interest rate per period, solved by Newton iteration. NaN when the
/// iteration does not converge.
pub fn rate(nper: f64, pmt: f64, pv: f64, fv_: f64) -> f64 {
    let mut r: f64 = 0.1;

    for _ in 0..RATE_MAX_ITER {
        let factor = (1.0 + r).powf(nper);
        let g = fv_ + pv * factor + pmt * (factor - 1.0) / r;
        let factor_p = nper * (1.0 + r).powf(nper - 1.0);
        let gp = pv * factor_p + pmt * (factor_p / r - (factor - 1.0) / (r * r));

        if gp == 0.0 || !gp.is_finite() {
            return f64::NAN;
        }

        let next = r - g / gp;
        if !next.is_finite() {
            return f64::NAN;
        }
        if (next - r).abs() < RATE_TOL {
            return next;
        }
        r = next;
    }

    f64::NAN
}

/// Internal rate of return of a cash-flow sequence. Newton first, then a
/// bisection fallback over a sign change; NaN for degenerate input.
pub fn irr(values: &[f64]) -> f64 {
    if values.len() < 2 || values.iter().all(|v| *v == 0.0) {
        return f64::NAN;
    }

    if let Some(r) = irr_newton(values) {
        return r;
    }
    irr_bisect(values).unwrap_or(f64::NAN)
}

fn irr_newton(values: &[f64]) -> Option<f64> {
    let mut r: f64 = 0.1;

    for _ in 0..RATE_MAX_ITER {
        let f = npv(r, values);
        let fp: f64 = values
            .iter()
            .enumerate()
            .map(|(i, v)| -(i as f64) * v / (1.0 + r).powi(i as i32 + 1))
            .sum();

        if fp == 0.0 || !fp.is_finite() {
            return None;
        }

        let next = r - f / fp;
        if !next.is_finite() || next <= -1.0 {
            return None;
        }
        if (next - r).abs() < RATE_TOL {
            return Some(next);
        }
        r = next;
    }

    None
}

fn irr_bisect(values: &[f64]) -> Option<f64> {
    let mut lo = -0.99;
    let mut hi = 10.0;
    let f_lo = npv(lo, values);
    let f_hi = npv(hi, values);
    if f_lo.signum() == f_hi.signum() {
        return None;
    }

    for _ in 0..200 {
        let mid = (lo + hi) / 2.0;
        let f_mid = npv(mid, values);
        if f_mid.abs() < RATE_TOL {
            return Some(mid);
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Some((lo + hi) / 2.0)
}
