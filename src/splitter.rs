//! A mechanism for splitting one line of a pseudo-file into columns
//!
//! Lines of procfs pseudo-files are made of a header (a label such as "Pid:",
//! or a tag such as "proc3") followed by whitespace-separated columns. The
//! kernel separates these columns with spaces, tabs, or a mixture of both
//! (/proc/<pid>/status writes "VmRSS:\t    2048 kB", for example).
//!
//! The standard SplitWhitespace iterator would do the job, but it treats its
//! input in a Unicode-aware fashion, whereas we know that the kernel only
//! emits ASCII text and only uses a couple of separator characters. So we
//! provide a leaner byte-oriented column iterator.


/// Iterator over the whitespace-separated columns of a single line of text
///
/// Iteration stops at the first newline, if any, so it is fine to feed this
/// with lines that still carry their terminating '\n'.
///
#[derive(Clone, Debug)]
pub(crate) struct SplitColumns<'a> {
    /// Reference to the line which we are trying to split
    target: &'a str,

    /// Iterator over the characters of the line and their byte indices
    char_iter: FastCharIndices<'a>,
}
//
impl<'a> SplitColumns<'a> {
    /// Create a column iterator for a line of text
    pub fn new(target: &'a str) -> Self {
        Self {
            target,
            char_iter: FastCharIndices::new(target),
        }
    }

    /// Consume the rest of the line, indicating how many columns were left
    pub fn col_count(self) -> usize {
        self.count()
    }
}
//
impl<'a> Iterator for SplitColumns<'a> {
    /// We're outputting strings
    type Item = &'a str;

    /// This is how one iterates through separated columns until a newline
    fn next(&mut self) -> Option<Self::Item> {
        // Find the first non-separator character before the end of line (if
        // any): that will be the start of the next column.
        let first_idx;
        loop {
            match self.char_iter.next() {
                // Discard all the separators along the way
                Some(' ') | Some('\t') | Some('\r') => continue,

                // A newline terminates the line. Stay on it, so that any
                // further call keeps reporting the end of the line.
                Some('\n') => {
                    self.char_iter.back();
                    return None;
                },

                // Record the index of the first column character
                Some(_) => {
                    first_idx = self.char_iter.prev_index();
                    break;
                },

                // Terminate when the end of the text is reached
                None => return None,
            }
        }

        // We are now inside of a column, and looking for its end
        loop {
            match self.char_iter.next() {
                // We reached the end of a column: output said column
                Some(' ') | Some('\t') | Some('\r') => {
                    let last_idx = self.char_iter.prev_index();
                    return Some(&self.target[first_idx..last_idx]);
                },

                // Newlines also terminate columns, but we must put them back
                // so that the next call signals the end of the line.
                Some('\n') => {
                    let last_idx = self.char_iter.prev_index();
                    self.char_iter.back();
                    return Some(&self.target[first_idx..last_idx]);
                },

                // We are still in the middle of the column: move on
                Some(_) => continue,

                // We reached the end of the input: output the last column
                None => return Some(&self.target[first_idx..]),
            }
        }
    }
}


/// A conceptual cousin of CharIndices, tightly optimized for the needs of
/// SplitColumns:
///
/// - Separators are all ASCII, so we can work byte-wise without ever cutting a
///   multi-byte character in half (UTF-8 continuation bytes are never ASCII)
/// - We need characters all the time, but indices only infrequently
/// - We may rarely backtrack on one specific character ('\n')
///
#[derive(Clone, Debug)]
struct FastCharIndices<'a> {
    /// Byte-wise view of the original string
    raw_bytes: &'a [u8],

    /// Byte index of the _next_ character
    next_char_index: usize,
}
//
impl<'a> FastCharIndices<'a> {
    /// Initialize the iterator
    #[inline]
    fn new(input: &'a str) -> Self {
        Self {
            raw_bytes: input.as_bytes(),
            next_char_index: 0,
        }
    }

    /// Tell what was the index of the last character from next()
    #[inline]
    fn prev_index(&self) -> usize {
        self.next_char_index - 1
    }

    /// Go back to the previous character, reverting the action of next()
    #[inline]
    fn back(&mut self) {
        self.next_char_index -= 1;
    }
}
//
impl<'a> Iterator for FastCharIndices<'a> {
    /// We implement the iterator interface for character iteration
    type Item = char;

    /// This is how we iterate through bytes. Non-ASCII bytes come out as
    /// Latin-1 garbage, which is fine since we only compare to separators.
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let result = self.raw_bytes.get(self.next_char_index)
                                   .map(|b| char::from(*b));
        if result.is_some() {
            self.next_char_index += 1;
        }
        result
    }
}
