//! Typed views over command tokens.
//!
//! Every predicate here is pure. The matching conversion only means something
//! when its predicate holds; otherwise it returns the type's zero value, so
//! callers check first and convert second.

use std::fmt;

use bevy::prelude::*;

const TRUTHY: &[&str] = &["1", "on", "true", "yes"];
const FALSY: &[&str] = &["0", "off", "false", "no"];

/// A single positional token passed to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentValue {
    index: usize,
    raw: Box<str>,
}

impl ArgumentValue {
    /// Create a token at the given position.
    pub fn new(index: usize, raw: impl Into<Box<str>>) -> Self {
        Self {
            index,
            raw: raw.into(),
        }
    }

    /// Position of this token in its [`CommandArgs`].
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The token exactly as typed.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the token parses as a 32-bit signed integer.
    pub fn is_int(&self) -> bool {
        self.raw.parse::<i32>().is_ok()
    }

    pub fn to_int(&self) -> i32 {
        self.raw.parse().unwrap_or_default()
    }

    /// Whether the token parses as a 64-bit signed integer.
    pub fn is_long(&self) -> bool {
        self.raw.parse::<i64>().is_ok()
    }

    pub fn to_long(&self) -> i64 {
        self.raw.parse().unwrap_or_default()
    }

    /// Whether the token parses as a 16-bit signed integer.
    pub fn is_short(&self) -> bool {
        self.raw.parse::<i16>().is_ok()
    }

    pub fn to_short(&self) -> i16 {
        self.raw.parse().unwrap_or_default()
    }

    /// Whether the token parses as a 16-bit unsigned integer (item ids).
    pub fn is_ushort(&self) -> bool {
        self.raw.parse::<u16>().is_ok()
    }

    pub fn to_ushort(&self) -> u16 {
        self.raw.parse().unwrap_or_default()
    }

    /// Whether the token parses as a 32-bit unsigned integer.
    pub fn is_unsigned(&self) -> bool {
        self.raw.parse::<u32>().is_ok()
    }

    pub fn to_unsigned(&self) -> u32 {
        self.raw.parse().unwrap_or_default()
    }

    /// Whether the token is a finite floating point number.
    ///
    /// `inf` and `NaN` are rejected even though Rust's parser accepts them.
    pub fn is_float(&self) -> bool {
        self.raw.parse::<f32>().is_ok_and(f32::is_finite)
    }

    pub fn to_float(&self) -> f32 {
        self.raw
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or_default()
    }

    /// Whether the token reads as an on/off switch (`1`, `on`, `true`, `yes`
    /// and their negatives).
    pub fn is_boolean(&self) -> bool {
        self.is_one_of(TRUTHY) || self.is_one_of(FALSY)
    }

    pub fn to_boolean(&self) -> bool {
        self.is_one_of(TRUTHY)
    }

    /// Case-insensitive equality.
    pub fn is(&self, other: &str) -> bool {
        self.raw.eq_ignore_ascii_case(other)
    }

    /// Case-insensitive membership test.
    pub fn is_one_of(&self, options: &[&str]) -> bool {
        options.iter().any(|option| self.is(option))
    }

    pub fn to_lowercase(&self) -> String {
        self.raw.to_lowercase()
    }
}

impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl AsRef<str> for ArgumentValue {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

/// Arguments passed to a command handler, excluding the command label.
///
/// The length of this sequence is the arity used to pick a handler variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs {
    raw: Box<str>,
    values: Vec<ArgumentValue>,
}

impl CommandArgs {
    /// Build arguments from the raw input line and its tokens.
    pub fn new<I, S>(raw: impl Into<Box<str>>, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Box<str>>,
    {
        let values = tokens
            .into_iter()
            .enumerate()
            .map(|(index, token)| ArgumentValue::new(index, token))
            .collect();

        Self {
            raw: raw.into(),
            values,
        }
    }

    /// Convenience for tests and programmatic dispatch: the tokens are also
    /// used to rebuild the raw line.
    pub fn from_tokens(tokens: &[&str]) -> Self {
        Self::new(tokens.join(" "), tokens.iter().copied())
    }

    /// The complete input line this was parsed from.
    #[inline]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Checked access.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&ArgumentValue> {
        self.values.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArgumentValue> {
        self.values.iter()
    }

    /// Join the tokens from `start` to the end with single spaces.
    ///
    /// # Panics
    ///
    /// Panics if `start > self.len()`.
    pub fn join_from(&self, start: usize) -> String {
        self.values[start..]
            .iter()
            .map(ArgumentValue::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Read three consecutive tokens starting at `start` as a position.
    ///
    /// Returns `None` unless all three are floats.
    ///
    /// # Panics
    ///
    /// Panics if fewer than three tokens exist from `start`.
    pub fn vector3(&self, start: usize) -> Option<Vec3> {
        let [x, y, z] = [&self[start], &self[start + 1], &self[start + 2]];

        if !(x.is_float() && y.is_float() && z.is_float()) {
            return None;
        }

        Some(Vec3::new(x.to_float(), y.to_float(), z.to_float()))
    }
}

impl std::ops::Index<usize> for CommandArgs {
    type Output = ArgumentValue;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_predicates() {
        let twelve = ArgumentValue::new(0, "12");
        assert!(twelve.is_int());
        assert_eq!(twelve.to_int(), 12);

        let fractional = ArgumentValue::new(0, "12.5");
        assert!(!fractional.is_int());
        assert!(fractional.is_float());
        assert_eq!(fractional.to_float(), 12.5);
    }

    #[test]
    fn test_conversion_without_predicate_is_zero() {
        let word = ArgumentValue::new(0, "abc");
        assert!(!word.is_int());
        assert_eq!(word.to_int(), 0);
        assert_eq!(word.to_float(), 0.0);
    }

    #[test]
    fn test_float_rejects_non_finite() {
        assert!(!ArgumentValue::new(0, "inf").is_float());
        assert!(!ArgumentValue::new(0, "NaN").is_float());
        assert!(ArgumentValue::new(0, "-3").is_float());
    }

    #[test]
    fn test_unsigned_ranges() {
        assert!(ArgumentValue::new(0, "65535").is_ushort());
        assert!(!ArgumentValue::new(0, "65536").is_ushort());
        assert!(!ArgumentValue::new(0, "-1").is_unsigned());
        assert!(ArgumentValue::new(0, "-1").is_short());
    }

    #[test]
    fn test_boolean_like() {
        assert!(ArgumentValue::new(0, "ON").is_boolean());
        assert!(ArgumentValue::new(0, "ON").to_boolean());
        assert!(ArgumentValue::new(0, "off").is_boolean());
        assert!(!ArgumentValue::new(0, "off").to_boolean());
        assert!(!ArgumentValue::new(0, "maybe").is_boolean());
    }

    #[test]
    fn test_case_insensitive_equality() {
        let arg = ArgumentValue::new(0, "AutoReload");
        assert!(arg.is("autoreload"));
        assert!(arg.is_one_of(&["autorepair", "AUTORELOAD"]));
        assert_eq!(arg.to_lowercase(), "autoreload");
    }

    #[test]
    fn test_join_from() {
        let args = CommandArgs::from_tokens(&["server", "going", "down"]);
        assert_eq!(args.join_from(0), "server going down");
        assert_eq!(args.join_from(1), "going down");
        assert_eq!(args.join_from(3), "");
    }

    #[test]
    #[should_panic]
    fn test_join_past_end_panics() {
        CommandArgs::from_tokens(&["a"]).join_from(2);
    }

    #[test]
    fn test_vector3() {
        let args = CommandArgs::from_tokens(&["bob", "1", "2.5", "-3"]);
        assert_eq!(args.vector3(1), Some(Vec3::new(1.0, 2.5, -3.0)));
        assert_eq!(args.vector3(0), None);
    }

    #[test]
    fn test_vector3_never_partial() {
        let args = CommandArgs::from_tokens(&["1", "2", "z"]);
        assert_eq!(args.vector3(0), None);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_index_panics() {
        let args = CommandArgs::from_tokens(&["only"]);
        let _ = &args[1];
    }

    #[test]
    fn test_indices_follow_position() {
        let args = CommandArgs::from_tokens(&["a", "b"]);
        assert_eq!(args[1].index(), 1);
        assert_eq!(args.get(1).map(ArgumentValue::as_str), Some("b"));
        assert!(args.get(2).is_none());
        assert!(CommandArgs::default().is_empty());
    }
}
