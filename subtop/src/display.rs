use std::io::{self, Write};

// Cursor up one line, then erase that line.
const ERASE_PREVIOUS_LINE: &str = "\x1B[A\x1B[2K";

/// Draws the top-N frame in place, erasing exactly the lines the previous
/// frame printed.
pub struct FrameRenderer<W: Write> {
    out: W,
    printed_lines: usize,
}

impl<W: Write> FrameRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            printed_lines: 0,
        }
    }

    pub fn render(&mut self, lines: &[String]) -> io::Result<()> {
        for _ in 0..self.printed_lines {
            self.out.write_all(ERASE_PREVIOUS_LINE.as_bytes())?;
        }
        self.printed_lines = 0;

        for line in lines {
            writeln!(self.out, "{}", line)?;
            self.printed_lines += 1;
        }
        self.out.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}
