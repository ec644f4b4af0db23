//! Cut-point selection.
//!
//! Given a target offset inside a fragment, picks the actual row to cut at.
//! Table boundaries outrank every pixel heuristic; the heuristics then try,
//! in order, a blank run near the target, a ruled (heavy) row, a backtrack
//! toward the previous cut, and the lowest-density row in the window, before
//! giving up and cutting exactly at the target. Selection is deterministic
//! and a chosen cut never exceeds the page capacity.

use crate::document::{Boundary, BoundaryKind};

use super::profile::RowProfile;

/// Inputs that stay fixed across one fragment's cuts.
#[derive(Debug, Clone, Copy)]
pub struct CutParams {
    /// Page capacity in rows (page height minus footer).
    pub capacity: u32,
    /// Search window around the target, in rows. 0 means the whole page.
    pub window: u32,
    /// Minimum consecutive blank rows that count as a safe gap.
    pub min_blank_run: u32,
}

/// A selected cut: slice the fragment at `y`, with the boundary kind when the
/// cut landed on a recorded table edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cut {
    pub y: u32,
    pub boundary: Option<BoundaryKind>,
}

/// Slices shorter than this are considered whitespace noise.
pub(crate) fn min_meaningful_height(min_blank_run: u32) -> u32 {
    min_blank_run.max(8)
}

/// Greatest boundary in `(lower, upper]`.
fn last_boundary_in(boundaries: &[Boundary], lower: u32, upper: u32) -> Option<Boundary> {
    boundaries
        .iter()
        .rev()
        .find(|b| b.offset > lower && b.offset <= upper)
        .copied()
}

/// Scan backward through the window for a centered run of blank rows, then
/// forward. Backward hits cut below the run, forward hits cut above it.
fn blank_run_cut(blank: &[bool], approx: u32, window: u32, run: u32) -> Option<u32> {
    let h = blank.len() as i64;
    if h == 0 {
        return None;
    }
    let approx = (approx as i64).clamp(0, h - 1);
    let run = run.max(1) as i64;
    let window = window as i64;

    let all_blank =
        |y0: i64, y1: i64| y0 >= 0 && y1 <= h && (y0..y1).all(|k| blank[k as usize]);

    let top = (approx - window).max(0);
    let mut y = approx;
    while y >= top {
        let y0 = y - run / 2;
        if all_blank(y0, y0 + run) {
            return Some((y0 + run) as u32);
        }
        y -= 1;
    }

    let bot = (approx + window).min(h);
    let mut y = approx;
    while y < bot {
        let y0 = y - run / 2;
        if all_blank(y0, y0 + run) {
            return Some(y0 as u32);
        }
        y += 1;
    }
    None
}

/// Nearest heavy row in the window, forward first; cut lands just below it.
fn heavy_separator(heavy: &[bool], approx: u32, window: u32) -> Option<u32> {
    let h = heavy.len() as i64;
    if h == 0 {
        return None;
    }
    let approx = (approx as i64).clamp(0, h - 1);
    let window = window as i64;
    let top = (approx - window).max(0);
    let bot = (approx + window).min(h);

    for dir in [1i64, -1] {
        let mut y = approx;
        while y >= top && y < bot {
            if heavy[y as usize] {
                return Some((y + 1).min(h) as u32);
            }
            y += dir;
        }
    }
    None
}

/// Scan backward from the target all the way to the previous cut for either
/// a heavy row or a blank run ending at the scanned row.
fn backtrack(blank: &[bool], heavy: &[bool], approx: u32, lower: u32, run: u32) -> Option<u32> {
    if approx <= lower {
        return None;
    }
    let run = run.max(1) as i64;
    let lower = lower as i64;

    let mut y = approx as i64 - 1;
    while y >= lower {
        if (y as usize) < heavy.len() && heavy[y as usize] {
            return Some(((y + 1) as u32).min(blank.len() as u32));
        }
        let start = lower.max(y - run + 1);
        let gap = (start..=y).all(|k| (k as usize) < blank.len() && blank[k as usize]);
        if gap {
            return Some((y + 1) as u32);
        }
        y -= 1;
    }
    None
}

/// Lowest-density row in the window below the target; ties go to the row
/// nearest the target. Cut lands just below the chosen row.
fn lowest_density(density: &[f32], approx: u32, window: u32, lower: u32) -> Option<u32> {
    let search_lower = (approx as i64 - window as i64).max(lower as i64);
    let mut best: Option<(i64, f32)> = None;
    let mut row = approx as i64 - 1;
    while row >= search_lower {
        if row >= 0 && (row as usize) < density.len() {
            let d = density[row as usize];
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((row, d));
            }
        }
        row -= 1;
    }
    best.map(|(r, _)| (r + 1) as u32)
}

/// Select the next cut after `last_cut` in a fragment whose content ends at
/// `total`. `profile` is `None` in non-smart mode, which reduces selection to
/// boundaries plus fixed-stride cuts.
pub fn select_cut(
    profile: Option<&RowProfile>,
    boundaries: &[Boundary],
    last_cut: u32,
    total: u32,
    params: &CutParams,
) -> Cut {
    let capacity = params.capacity.max(1);
    let run = params.min_blank_run.max(1);
    let remaining = total.saturating_sub(last_cut);

    // Everything left fits on one page; still never end mid-table.
    if remaining <= capacity {
        return match last_boundary_in(boundaries, last_cut, total) {
            Some(b) => Cut {
                y: b.offset,
                boundary: Some(b.kind),
            },
            None => Cut {
                y: total,
                boundary: None,
            },
        };
    }

    let target = last_cut + capacity;
    if let Some(b) = last_boundary_in(boundaries, last_cut, target) {
        return Cut {
            y: b.offset,
            boundary: Some(b.kind),
        };
    }

    let window = if params.window == 0 {
        capacity
    } else {
        params.window
    };

    let mut cut = target;
    if let Some(p) = profile {
        let usable = |c: u32| c > last_cut && c <= target;
        if let Some(c) = blank_run_cut(&p.blank, target, window, run).filter(|&c| usable(c)) {
            cut = c;
        }
        if cut == target {
            if let Some(c) = heavy_separator(&p.heavy, target, window).filter(|&c| usable(c)) {
                cut = c;
            }
        }
        if cut == target {
            if let Some(c) =
                backtrack(&p.blank, &p.heavy, target, last_cut, run).filter(|&c| usable(c))
            {
                cut = c;
            }
        }
        if cut == target {
            if let Some(c) =
                lowest_density(&p.density, target, window, last_cut).filter(|&c| usable(c))
            {
                cut = c;
            }
        }
    }

    let min_payload = (capacity / 4).max(min_meaningful_height(run));
    if cut - last_cut < min_payload && remaining > min_payload {
        cut = (last_cut + min_payload).min(total);
    }
    if cut <= last_cut {
        cut = target.min(last_cut + run);
    }

    Cut {
        y: cut,
        boundary: None,
    }
}

// ============================================================
// Tests
// ============================================================
