use anyhow::bail;
use anyhow::Context;

use crate::parse;
use crate::Coord;

/// Header of a Run-Length-Encoded pattern.
///
/// See: https://conwaylife.com/wiki/Run_Length_Encoded
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RleHeader {
    pub width: Coord,
    pub height: Coord,
}

/// Parse an RLE pattern, calling `f` with the coordinates of every alive
/// cell, offset to the given origin. Assumes the bytes are valid ascii.
///
/// The header's bounds pull the origin back as needed so the whole pattern
/// fits the signed 64-bit coordinate range. A `rule` declaration other than
/// Conway's B3/S23 is rejected.
pub fn read_rle<F>(
    bytes: &[u8],
    origin_x: Coord,
    origin_y: Coord,
    mut f: F,
) -> anyhow::Result<RleHeader>
where
    F: FnMut(Coord, Coord),
{
    let mut bytes = parse::take_ws(bytes);

    // comment lines
    while parse::peek_1(bytes) == Some(b'#') {
        let (_, rest) = parse::take_line(bytes);
        bytes = parse::take_ws(rest);
    }

    let header = if parse::peek_1(bytes) == Some(b'x') {
        let (line, rest) = parse::take_line(bytes);
        bytes = rest;

        read_header(line).context("failed to read header line")?
    } else {
        RleHeader::default()
    };

    let origin_x = clamp_origin(origin_x, header.width);
    let origin_y = clamp_origin(origin_y, header.height);

    read_encoding(bytes, origin_x, origin_y, &mut f).context("failed to read encoding")?;

    Ok(header)
}

/// Parse an RLE pattern into a list of alive-cell coordinates.
pub fn read_rle_coords(
    bytes: &[u8],
    origin_x: Coord,
    origin_y: Coord,
) -> anyhow::Result<Vec<(Coord, Coord)>> {
    let mut cells = Vec::new();
    read_rle(bytes, origin_x, origin_y, |x, y| cells.push((x, y)))?;

    Ok(cells)
}

// Parse lines that look like `x = 3, y = 3, rule = B3/S23`
fn read_header(bytes: &[u8]) -> anyhow::Result<RleHeader> {
    let bytes = parse::expect(b'x', bytes)?;
    let bytes = parse::take_ws(bytes);
    let bytes = parse::expect(b'=', bytes)?;
    let bytes = parse::take_ws(bytes);

    let (Some(w), bytes) = parse::take_while_fn(|b| b.is_ascii_digit(), bytes) else {
        bail!("expected pattern width");
    };
    let width: Coord = parse::convert(w)?;

    let bytes = parse::take_ws(bytes);
    let bytes = parse::expect(b',', bytes)?;
    let bytes = parse::take_ws(bytes);
    let bytes = parse::expect(b'y', bytes)?;
    let bytes = parse::take_ws(bytes);
    let bytes = parse::expect(b'=', bytes)?;
    let bytes = parse::take_ws(bytes);

    let (Some(h), bytes) = parse::take_while_fn(|b| b.is_ascii_digit(), bytes) else {
        bail!("expected pattern height");
    };
    let height: Coord = parse::convert(h)?;

    let bytes = parse::take_ws(bytes);
    if !bytes.is_empty() {
        let bytes = parse::expect(b',', bytes)?;
        let bytes = parse::take_ws(bytes);
        read_rule(bytes)?;
    }

    Ok(RleHeader { width, height })
}

// The engine hard-codes Conway's rule, so anything else in the header is
// rejected up front.
fn read_rule(bytes: &[u8]) -> anyhow::Result<()> {
    let Some(rest) = bytes.strip_prefix(b"rule") else {
        bail!("expected rule declaration");
    };

    let rest = parse::take_ws(rest);
    let rest = parse::expect(b'=', rest)?;
    let rest = parse::take_ws(rest);

    let rule: Vec<u8> = rest
        .iter()
        .map(|b| b.to_ascii_lowercase())
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    if rule != b"b3/s23" {
        bail!("unsupported rule \"{}\"", String::from_utf8_lossy(rest).trim());
    }

    Ok(())
}

fn read_encoding<F>(
    mut bytes: &[u8],
    origin_x: Coord,
    origin_y: Coord,
    f: &mut F,
) -> anyhow::Result<()>
where
    F: FnMut(Coord, Coord),
{
    let mut run: Option<Coord> = None;
    let (mut x, mut y) = (origin_x, origin_y);

    loop {
        let Some(b) = parse::peek_1(bytes) else {
            bail!("pattern ended without '!'");
        };

        match b {
            // end of pattern
            b'!' => break,

            b if b.is_ascii_whitespace() => {
                bytes = &bytes[1..];
            }

            // dead run
            b'b' => {
                bytes = &bytes[1..];
                x = x.saturating_add(run.take().unwrap_or(1));
            }

            // alive run
            b'o' => {
                bytes = &bytes[1..];
                for _ in 0..run.take().unwrap_or(1) {
                    f(x, y);
                    x = x.saturating_add(1);
                }
            }

            // end of row
            b'$' => {
                bytes = &bytes[1..];
                y = y.saturating_add(run.take().unwrap_or(1));
                x = origin_x;
            }

            b if b.is_ascii_digit() => {
                let (Some(digits), rest) = parse::take_while_fn(|b| b.is_ascii_digit(), bytes)
                else {
                    unreachable!("peeked a digit");
                };
                bytes = rest;

                run = Some(parse::convert(digits).context("failed to convert run length")?);
            }

            b => bail!("unrecognized character '{}'", b as char),
        }
    }

    Ok(())
}

/// Pull the origin back so a pattern `extent` cells wide starting there
/// stays inside the signed 64-bit coordinate range, with its last cell one
/// short of the boundary.
fn clamp_origin(origin: Coord, extent: Coord) -> Coord {
    if extent <= 0 {
        return origin;
    }

    match origin.checked_add(extent - 1) {
        Some(_) => origin,
        None => Coord::MAX - extent,
    }
}

#[cfg(test)]
mod tests {
    use crate::Coord;

    use super::read_rle_coords;
    use super::RleHeader;

    const GLIDER: &[u8] = b"\
#N Glider
#C The smallest, most common, and first discovered spaceship.
x = 3, y = 3, rule = B3/S23
bob$2bo$3o!
";

    #[test]
    fn glider_cells() -> anyhow::Result<()> {
        let cells = read_rle_coords(GLIDER, 0, 0)?;

        assert_eq!(cells, vec![(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)]);

        Ok(())
    }

    #[test]
    fn origin_offsets_every_cell() -> anyhow::Result<()> {
        let cells = read_rle_coords(GLIDER, -10, 100)?;

        assert_eq!(
            cells,
            vec![(-9, 100), (-8, 101), (-10, 102), (-9, 102), (-8, 102)]
        );

        Ok(())
    }

    #[test]
    fn header_is_reported() -> anyhow::Result<()> {
        let mut count = 0;
        let header = super::read_rle(GLIDER, 0, 0, |_, _| count += 1)?;

        assert_eq!(
            header,
            RleHeader {
                width: 3,
                height: 3
            }
        );
        assert_eq!(count, 5);

        Ok(())
    }

    #[test]
    fn header_is_optional() -> anyhow::Result<()> {
        let cells = read_rle_coords(b"obo!", 0, 0)?;

        assert_eq!(cells, vec![(0, 0), (2, 0)]);

        Ok(())
    }

    #[test]
    fn runs_expand() -> anyhow::Result<()> {
        let cells = read_rle_coords(b"x = 5, y = 2\n3o2b$4bo!", 0, 0)?;

        assert_eq!(cells, vec![(0, 0), (1, 0), (2, 0), (4, 1)]);

        Ok(())
    }

    #[test]
    fn multi_row_skips() -> anyhow::Result<()> {
        let cells = read_rle_coords(b"x = 1, y = 4\no3$o!", 0, 0)?;

        assert_eq!(cells, vec![(0, 0), (0, 3)]);

        Ok(())
    }

    #[test]
    fn origin_is_clamped_to_the_coordinate_range() -> anyhow::Result<()> {
        let cells = read_rle_coords(b"x = 3, y = 1\n3o!", Coord::MAX - 1, 0)?;

        assert_eq!(
            cells,
            vec![(Coord::MAX - 3, 0), (Coord::MAX - 2, 0), (Coord::MAX - 1, 0)]
        );

        Ok(())
    }

    #[test]
    fn non_conway_rules_are_rejected() {
        let res = read_rle_coords(b"x = 1, y = 1, rule = B36/S23\no!", 0, 0);

        assert!(res.is_err());
    }

    #[test]
    fn conway_rule_spellings_are_accepted() -> anyhow::Result<()> {
        read_rle_coords(b"x = 1, y = 1, rule = b3/s23\no!", 0, 0)?;
        read_rle_coords(b"x = 1, y = 1, rule = B3/S23\no!", 0, 0)?;

        Ok(())
    }

    #[test]
    fn truncated_patterns_are_rejected() {
        assert!(read_rle_coords(b"x = 3, y = 3\nbob$2bo", 0, 0).is_err());
        assert!(read_rle_coords(b"x = 3, y = 3\nbxb!", 0, 0).is_err());
    }
}
