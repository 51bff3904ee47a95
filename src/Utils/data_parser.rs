/// parse pasted two-column text "x1,y1\nx2,y2\n..." (comma or tab separated) into x and y vectors
use nom::{IResult, Parser, character::complete::space0, number::complete::double, sequence::preceded};

/// leading number of a field; trailing garbage is ignored ("12.5 mM" -> 12.5)
fn leading_number(input: &str) -> IResult<&str, f64> {
    preceded(space0, double).parse(input)
}

fn parse_field(field: &str) -> Option<f64> {
    match leading_number(field.trim()) {
        Ok((_, value)) if !value.is_nan() => Some(value),
        _ => None,
    }
}

/// Parse one line into an (x, y) pair. A line containing a comma is split by commas,
/// otherwise by tabs. Columns after the second are ignored.
pub fn parse_xy_line(line: &str) -> Option<(f64, f64)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let separator = if line.contains(',') { ',' } else { '\t' };
    let mut parts = line.split(separator);
    let x = parse_field(parts.next()?)?;
    let y = parse_field(parts.next()?)?;
    Some((x, y))
}

/// Parse the whole text; blank and malformed lines are skipped.
pub fn parse_xy_text(text: &str) -> (Vec<f64>, Vec<f64>) {
    text.lines().filter_map(parse_xy_line).unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_and_tab_lines() {
        let text = "0.5,8.5\n1\t15.5\n\n 2 , 25.1 \n";
        let (x, y) = parse_xy_text(text);
        assert_eq!(x, vec![0.5, 1.0, 2.0]);
        assert_eq!(y, vec![8.5, 15.5, 25.1]);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let text = "x,y\n1,2\nabc\n3;4\n5,\n6,7,8\n1e-3,2E2\nnan,1";
        let (x, y) = parse_xy_text(text);
        assert_eq!(x, vec![1.0, 6.0, 1e-3]);
        assert_eq!(y, vec![2.0, 7.0, 200.0]);
    }

    #[test]
    fn trailing_units_are_ignored() {
        assert_eq!(parse_xy_line("10 uM, 50 %"), Some((10.0, 50.0)));
        assert_eq!(parse_xy_line("-1.5\t-2"), Some((-1.5, -2.0)));
        assert_eq!(parse_xy_line("   "), None);
    }
}
