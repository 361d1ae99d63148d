use core::fmt;

use heapless::String;

/// Fixed-capacity text buffer that drops whatever does not fit instead of
/// failing the whole `write!`.
#[derive(Default)]
pub struct LineBuffer<const N: usize> {
    text: String<N>,
}

impl<const N: usize> LineBuffer<N> {
    pub fn new() -> Self {
        Self { text: String::new() }
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }
}

impl<const N: usize> fmt::Write for LineBuffer<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.text.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;

    #[test]
    fn truncates_instead_of_failing() {
        let mut line = LineBuffer::<8>::new();
        write!(line, "level {} of {}", 12, 18).unwrap();
        assert_eq!(line.as_str(), "level 12");
    }

    #[test]
    fn keeps_short_text() {
        let mut line = LineBuffer::<64>::new();
        write!(line, "{}={}", "Joystick", 1).unwrap();
        assert_eq!(line.as_bytes(), b"Joystick=1");
    }
}
