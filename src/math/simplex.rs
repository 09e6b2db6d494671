//! Nelder–Mead downhill simplex minimisation
//!
//! Derivative-free minimiser for the small constrained transform fits where
//! no closed form exists. The objective is evaluated on an `n + 1` vertex
//! simplex that reflects, expands, contracts and shrinks towards a minimum.

use nalgebra::DVector;

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Stopping rules for [`minimize`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplexOptions {
    /// Maximum number of simplex updates
    pub max_iterations: usize,
    /// Relative spread of vertex values at which the search stops
    pub tolerance: f64,
}

/// Result of a simplex search
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// Best parameter vector found
    pub point: Vec<f64>,
    /// Objective value at `point`
    pub value: f64,
    /// Number of simplex updates performed
    pub iterations: usize,
}

/// Minimise `objective` starting from `start`
///
/// The initial simplex places one vertex at `start` and one more vertex per
/// parameter, displaced by the matching entry of `steps`.
pub fn minimize<F>(objective: F, start: &[f64], steps: &[f64], options: SimplexOptions) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let evaluate = |x: &DVector<f64>| objective(x.as_slice());
    let origin = DVector::from_column_slice(start);

    let mut vertices: Vec<(DVector<f64>, f64)> = Vec::with_capacity(start.len() + 1);
    vertices.push((origin.clone(), evaluate(&origin)));
    for (axis, &step) in steps.iter().enumerate().take(start.len()) {
        let mut vertex = origin.clone();
        if let Some(entry) = vertex.get_mut(axis) {
            *entry += step;
        }
        let value = evaluate(&vertex);
        vertices.push((vertex, value));
    }

    let mut iterations = 0;
    while iterations < options.max_iterations {
        vertices.sort_by(|a, b| a.1.total_cmp(&b.1));
        let best = vertices.first().map_or(0.0, |v| v.1);
        let worst = vertices.last().map_or(0.0, |v| v.1);
        if (worst - best).abs() <= options.tolerance * (best.abs() + worst.abs()) + f64::MIN_POSITIVE {
            break;
        }
        iterations += 1;

        let Some((worst_point, worst_value)) = vertices.last().cloned() else {
            break;
        };
        let second_worst = vertices.iter().rev().nth(1).map_or(worst_value, |v| v.1);
        let kept = vertices.len() - 1;
        let centroid = vertices
            .iter()
            .take(kept)
            .fold(DVector::zeros(origin.len()), |acc, (p, _)| acc + p)
            / kept.max(1) as f64;

        let reflected = &centroid + (&centroid - &worst_point) * REFLECTION;
        let reflected_value = evaluate(&reflected);

        let replacement = if reflected_value < best {
            let expanded = &centroid + (&reflected - &centroid) * EXPANSION;
            let expanded_value = evaluate(&expanded);
            if expanded_value < reflected_value {
                Some((expanded, expanded_value))
            } else {
                Some((reflected, reflected_value))
            }
        } else if reflected_value < second_worst {
            Some((reflected, reflected_value))
        } else {
            let contracted = if reflected_value < worst_value {
                &centroid + (&reflected - &centroid) * CONTRACTION
            } else {
                &centroid + (&worst_point - &centroid) * CONTRACTION
            };
            let contracted_value = evaluate(&contracted);
            (contracted_value < reflected_value.min(worst_value))
                .then_some((contracted, contracted_value))
        };

        if let Some(vertex) = replacement {
            if let Some(last) = vertices.last_mut() {
                *last = vertex;
            }
        } else {
            shrink(&mut vertices, &evaluate);
        }
    }

    vertices.sort_by(|a, b| a.1.total_cmp(&b.1));
    let (point, value) = vertices
        .into_iter()
        .next()
        .map_or_else(|| (start.to_vec(), f64::INFINITY), |(p, v)| (p.as_slice().to_vec(), v));
    Minimum {
        point,
        value,
        iterations,
    }
}

// Pull every vertex halfway towards the best one
fn shrink<E>(vertices: &mut [(DVector<f64>, f64)], evaluate: &E)
where
    E: Fn(&DVector<f64>) -> f64,
{
    let Some(best) = vertices.first().map(|v| v.0.clone()) else {
        return;
    };
    for (point, value) in vertices.iter_mut().skip(1) {
        *point = &best + (&*point - &best) * SHRINK;
        *value = evaluate(point);
    }
}
