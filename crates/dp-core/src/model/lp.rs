//! CPLEX LP export for external MILP solvers.

use std::io::{self, Write};

use super::{Direction, LinearExpr, Model, VarId, VarKind};

const TERMS_PER_LINE: usize = 8;

fn write_expr<W: Write>(model: &Model, expr: &LinearExpr, out: &mut W) -> io::Result<()> {
    if expr.is_empty() {
        return match model.num_variables() {
            0 => write!(out, " 0"),
            _ => write!(out, " 0 {}", model.export_name(VarId(0))),
        };
    }
    for (k, (var, coefficient)) in expr.terms().iter().enumerate() {
        if k > 0 && k % TERMS_PER_LINE == 0 {
            write!(out, "\n  ")?;
        }
        let sign = if *coefficient < 0.0 { '-' } else { '+' };
        let magnitude = coefficient.abs();
        if magnitude == 1.0 {
            write!(out, " {} {}", sign, model.export_name(*var))?;
        } else {
            write!(out, " {} {} {}", sign, magnitude, model.export_name(*var))?;
        }
    }
    Ok(())
}

/// Write the model in CPLEX LP format.
///
/// Unnamed variables are written as `v{index}`. The objective constant is
/// recorded as a comment since it does not affect the optimum.
pub fn write_lp<W: Write>(model: &Model, mut out: W) -> io::Result<()> {
    writeln!(
        out,
        "\\ {} variables, {} constraints",
        model.num_variables(),
        model.constraints().len()
    )?;
    let constant = model.objective().constant_term();
    if constant != 0.0 {
        writeln!(out, "\\ objective constant: {}", constant)?;
    }
    writeln!(
        out,
        "{}",
        match model.direction() {
            Direction::Maximize => "Maximize",
            Direction::Minimize => "Minimize",
        }
    )?;
    write!(out, " obj:")?;
    write_expr(model, model.objective(), &mut out)?;
    writeln!(out)?;

    let (eager, lazy): (Vec<_>, Vec<_>) = model
        .constraints()
        .iter()
        .enumerate()
        .partition(|(_, c)| !c.lazy);

    writeln!(out, "Subject To")?;
    for (i, c) in &eager {
        write!(out, " c{}:", i)?;
        write_expr(model, &c.expr, &mut out)?;
        writeln!(out, " {} {}", c.sense.symbol(), c.rhs)?;
    }
    if !lazy.is_empty() {
        writeln!(out, "Lazy Constraints")?;
        for (i, c) in &lazy {
            write!(out, " l{}:", i)?;
            write_expr(model, &c.expr, &mut out)?;
            writeln!(out, " {} {}", c.sense.symbol(), c.rhs)?;
        }
    }

    writeln!(out, "Bounds")?;
    for (i, v) in model.variables().iter().enumerate() {
        if v.kind == VarKind::Binary {
            continue;
        }
        let name = model.export_name(VarId(i));
        match (v.lower.is_finite(), v.upper.is_finite()) {
            (false, false) => writeln!(out, " {} free", name)?,
            (true, true) => writeln!(out, " {} <= {} <= {}", v.lower, name, v.upper)?,
            (true, false) => writeln!(out, " {} >= {}", name, v.lower)?,
            (false, true) => writeln!(out, " -inf <= {} <= {}", name, v.upper)?,
        }
    }

    let binaries: Vec<String> = model
        .variables()
        .iter()
        .enumerate()
        .filter(|(_, v)| v.kind == VarKind::Binary)
        .map(|(i, _)| model.export_name(VarId(i)))
        .collect();
    if !binaries.is_empty() {
        writeln!(out, "Binaries")?;
        for chunk in binaries.chunks(TERMS_PER_LINE) {
            writeln!(out, " {}", chunk.join(" "))?;
        }
    }
    writeln!(out, "End")
}
