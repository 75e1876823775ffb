use std::collections::HashSet;
use std::fmt::Write;

use num_bigint::BigInt;

/// Largest bounding box drawn as a grid. Anything wider falls back to a
/// coordinate listing.
pub const RENDER_SIZE_MAX: u32 = 128;

/// Most coordinates printed before the listing is truncated.
pub const PRINT_CELLS_MAX: usize = 100;

/// Render a display list: an ascii grid over the bounding box when it is
/// small enough, a bounded coordinate listing otherwise. Alive cells draw
/// as `*`, dead cells as `_`.
pub fn render_display_list(list: &[(BigInt, BigInt)]) -> String {
    let Some(((min_x, max_x), (min_y, max_y))) = bounds(list) else {
        return String::from("(empty)");
    };

    let small = &max_x - &min_x < BigInt::from(RENDER_SIZE_MAX)
        && &max_y - &min_y < BigInt::from(RENDER_SIZE_MAX);

    if small {
        render_grid(list, (&min_x, &max_x), (&min_y, &max_y))
    } else {
        render_coords(list)
    }
}

fn bounds(list: &[(BigInt, BigInt)]) -> Option<((BigInt, BigInt), (BigInt, BigInt))> {
    let (first_x, first_y) = list.first()?;

    let (mut min_x, mut max_x) = (first_x.clone(), first_x.clone());
    let (mut min_y, mut max_y) = (first_y.clone(), first_y.clone());

    for (x, y) in &list[1..] {
        if x < &min_x {
            min_x = x.clone();
        } else if x > &max_x {
            max_x = x.clone();
        }
        if y < &min_y {
            min_y = y.clone();
        } else if y > &max_y {
            max_y = y.clone();
        }
    }

    Some(((min_x, max_x), (min_y, max_y)))
}

fn render_grid(
    list: &[(BigInt, BigInt)],
    (min_x, max_x): (&BigInt, &BigInt),
    (min_y, max_y): (&BigInt, &BigInt),
) -> String {
    let alive: HashSet<(BigInt, BigInt)> = list.iter().cloned().collect();

    let one = BigInt::from(1);
    let mut out = String::new();

    let mut y = min_y.clone();
    while &y <= max_y {
        if !out.is_empty() {
            out.push('\n');
        }

        let mut x = min_x.clone();
        while &x <= max_x {
            let cell = (x.clone(), y.clone());
            out.push(if alive.contains(&cell) { '*' } else { '_' });
            x = &x + &one;
        }

        y = &y + &one;
    }

    out
}

fn render_coords(list: &[(BigInt, BigInt)]) -> String {
    let mut out = String::new();

    for (i, (x, y)) in list.iter().enumerate() {
        if i == PRINT_CELLS_MAX {
            let _ = write!(out, " ... and {} more cells", list.len() - PRINT_CELLS_MAX);
            break;
        }

        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "({x}, {y})");
    }

    out
}
