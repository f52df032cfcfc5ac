/// Returns `true` when `id` is an acceptable license entry: `PROPRIETARY`,
/// `CUSTOM`, or a parseable SPDX expression.
pub fn is_valid_license(id: &str) -> bool {
    if id == "PROPRIETARY" || id == "CUSTOM" {
        return true;
    }
    spdx::Expression::parse(id).is_ok()
}
