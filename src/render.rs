use crate::stock::Bin;

const MAX_WIDTH: f64 = 80.0;

/// Draws a bin as a three-line bar: pieces are boxed and labelled with
/// their length, trim and leftovers stay blank.
pub fn render_bin(bin: &Bin) -> String {
    if bin.length <= 0.0 {
        return String::new();
    }
    let scale = MAX_WIDTH / bin.length;
    let grid_w = (bin.length * scale).round() as usize;

    let mut grid = vec![vec![' '; grid_w + 1]; 3];
    draw_span(&mut grid, 0, grid_w);

    for piece in &bin.boxes {
        let Some(x) = piece.x else { continue };
        let sx = ((x - bin.x) * scale).round() as usize;
        let sw = (piece.length * scale).round() as usize;
        if sw == 0 {
            continue;
        }
        draw_span(&mut grid, sx, sw);
        fill_span(&mut grid, sx, sw);

        let label: Vec<char> = format!("{}", piece.length).chars().collect();
        if sw > label.len() + 1 {
            let start = sx + (sw - label.len()) / 2;
            for (i, &ch) in label.iter().enumerate() {
                if start + i < grid[1].len() {
                    grid[1][start + i] = ch;
                }
            }
        }
    }

    let mut result = String::new();
    for row in &grid {
        let line: String = row.iter().collect();
        result.push_str(line.trim_end());
        result.push('\n');
    }
    result
}

fn draw_span(grid: &mut [Vec<char>], x: usize, w: usize) {
    let cols = grid[0].len();
    for i in x..=x + w {
        if i < cols {
            for row in [0, 2] {
                if grid[row][i] != '+' {
                    grid[row][i] = '-';
                }
            }
        }
    }
    for edge in [x, x + w] {
        if edge < cols {
            grid[0][edge] = '+';
            grid[1][edge] = '|';
            grid[2][edge] = '+';
        }
    }
}

fn fill_span(grid: &mut [Vec<char>], x: usize, w: usize) {
    let cols = grid[1].len();
    for i in x + 1..x + w {
        if i < cols && grid[1][i] == ' ' {
            grid[1][i] = '#';
        }
    }
}
