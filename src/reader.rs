use crate::error::{LispError, LispResult};
use crate::eval::Machine;
use crate::value::ObjId;

/// Parses source text into objects allocated in a machine.
///
/// The reader only holds the input and a position; the machine is passed to
/// each call so the caller can evaluate between reads.
pub struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a str) -> Self {
        Reader {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    /// Read one expression. Returns None at end of input.
    pub fn read(&mut self, m: &mut Machine) -> LispResult<Option<ObjId>> {
        if self.is_eof() {
            return Ok(None);
        }
        self.read_expr(m).map(Some)
    }

    /// True once only whitespace and comments remain.
    pub fn is_eof(&mut self) -> bool {
        self.skip_whitespace_and_comments();
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while matches!(self.peek(), Some(ch) if ch.is_ascii_whitespace()) {
                self.pos += 1;
            }
            if self.peek() == Some(b';') {
                while !matches!(self.peek(), None | Some(b'\n')) {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn read_expr(&mut self, m: &mut Machine) -> LispResult<ObjId> {
        self.skip_whitespace_and_comments();

        match self.peek() {
            None => Err(LispError::ReadError("unexpected EOF".into())),
            Some(b'(') => {
                self.pos += 1;
                self.read_list_tail(m)
            }
            Some(b')') => Err(LispError::ReadError("unexpected ')'".into())),
            Some(_) => self.read_atom(m),
        }
    }

    /// Read the rest of a list after its '(' or after an element.
    /// Each cell is built by pushing the head, pushing the tail, and letting
    /// the machine pop them back off into a pair.
    fn read_list_tail(&mut self, m: &mut Machine) -> LispResult<ObjId> {
        self.skip_whitespace_and_comments();

        match self.peek() {
            None => Err(LispError::ReadError("unterminated list".into())),
            Some(b')') => {
                self.pos += 1;
                m.nil()
            }
            Some(_) => {
                let head = self.read_expr(m)?;
                m.stack.push(head);
                let tail = match self.read_list_tail(m) {
                    Ok(tail) => tail,
                    Err(err) => {
                        m.stack.pop()?;
                        return Err(err);
                    }
                };
                m.stack.push(tail);
                m.cons_from_stack()
            }
        }
    }

    fn read_atom(&mut self, m: &mut Machine) -> LispResult<ObjId> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_whitespace() || ch == b'(' || ch == b')' || ch == b';' {
                break;
            }
            self.pos += 1;
        }
        let word = String::from_utf8_lossy(&self.input[start..self.pos]);

        if is_integer(&word) {
            match word.parse::<i64>() {
                Ok(n) => m.integer(n),
                Err(_) => Err(LispError::ReadError(format!(
                    "integer out of range: {}",
                    word
                ))),
            }
        } else {
            m.symbol(&word)
        }
    }
}

/// Optional '-' followed by at least one digit.
fn is_integer(word: &str) -> bool {
    let digits = word.strip_prefix('-').unwrap_or(word);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Read and evaluate every expression in `input`, returning the rendered
/// results. Each expression is evaluated before the next one is read, so no
/// unevaluated input sits outside the collector's roots.
pub fn eval_all(input: &str, m: &mut Machine) -> LispResult<Vec<String>> {
    let mut reader = Reader::new(input);
    let mut out = Vec::new();
    while let Some(expr) = reader.read(m)? {
        let value = m.evaluate_top_level(expr)?;
        out.push(m.render(value));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Object;

    fn read_one(input: &str) -> (Machine, ObjId) {
        let mut m = Machine::new().unwrap();
        let id = Reader::new(input).read(&mut m).unwrap().unwrap();
        (m, id)
    }

    #[test]
    fn reads_atoms() {
        let (m, id) = read_one("  -42 ");
        assert!(matches!(m.object(id), Ok(Object::Integer(-42))));
        let (m, id) = read_one("foo-bar");
        assert!(matches!(m.object(id), Ok(Object::Symbol(s)) if s == "foo-bar"));
        let (m, id) = read_one("-");
        assert!(matches!(m.object(id), Ok(Object::Symbol(s)) if s == "-"));
    }

    #[test]
    fn reads_nested_lists() {
        let (m, id) = read_one("(1 (2 3))");
        assert_eq!(m.render(id), "(1 2 3)");
        assert!(m.stack.is_empty());

        let car = m.object(id).unwrap().car().unwrap();
        assert!(matches!(m.object(car), Ok(Object::Integer(1))));
    }

    #[test]
    fn empty_list_is_nil() {
        let (m, id) = read_one("()");
        assert!(matches!(m.object(id), Ok(Object::Nil)));
    }

    #[test]
    fn skips_comments_and_reports_eof() {
        let mut m = Machine::new().unwrap();
        let mut r = Reader::new("; leading\n 7 ; trailing\n");
        assert!(!r.is_eof());
        let id = r.read(&mut m).unwrap().unwrap();
        assert_eq!(m.render(id), "7");
        assert!(r.is_eof());
        assert!(r.read(&mut m).unwrap().is_none());
    }

    #[test]
    fn malformed_input() {
        let mut m = Machine::new().unwrap();
        assert!(matches!(
            Reader::new(")").read(&mut m),
            Err(LispError::ReadError(_))
        ));
        assert!(matches!(
            Reader::new("(1 (2").read(&mut m),
            Err(LispError::ReadError(_))
        ));
        assert!(m.stack.is_empty());
        assert!(matches!(
            Reader::new("99999999999999999999").read(&mut m),
            Err(LispError::ReadError(_))
        ));
    }

    #[test]
    fn eval_all_renders_each_result() {
        let mut m = Machine::new().unwrap();
        let out = eval_all("(+ 1 2) (< 2 5) (1 2)", &mut m).unwrap();
        assert_eq!(out, vec!["3", "T", "(1 2)"]);
    }
}
