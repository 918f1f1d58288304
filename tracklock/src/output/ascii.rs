use crate::input::trackmap::*;
use std::fmt::Write;

/// Detailed grid, one character per cell (`#` wall, `*` above 9), then a
/// blank line and the number of exits of each coarse cell.
pub fn ascii_map(grid: &Grid) -> String {
    let mut s = String::new();
    for y in 0..detailed(grid.height()) {
        for x in 0..detailed(grid.width()) {
            s.push(match grid.detail(x, y) {
                0 => '#',
                v if v > 9 => '*',
                v => (b'0' + v) as char,
            });
        }
        s.push('\n');
    }
    s.push('\n');
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let _ = write!(s, "{}", grid.exits(Point::new(x, y)));
        }
        s.push('\n');
    }
    s
}
