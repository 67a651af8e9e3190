//! Small text helpers.

/// Name of a member as it should be spoken.
///
/// Display names often end with a discriminator-like number (`Shini1234`)
/// which sounds awkward once synthesized, so trailing digits and whitespace
/// are removed. A name made only of digits is kept as is.
///
/// # Examples
///
/// ```no_run
/// assert_eq!(spoken_name("Shini1234"), "Shini");
/// assert_eq!(spoken_name("1337"), "1337");
/// ```
pub fn spoken_name(display_name: &str) -> String {
    let trimmed = display_name
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_digit() || c.is_whitespace());

    if trimmed.is_empty() {
        display_name.trim().to_string()
    } else {
        trimmed.to_string()
    }
}
