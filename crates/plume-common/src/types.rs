use std::ops::Range;

pub type Span = Range<usize>;
