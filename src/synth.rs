//! Program synthesis: wrap a post's script body in the evaluable function.

/// Name of the function every script body becomes.
pub const EVAL_FUNCTION: &str = "Eval";

/// Wrap `content` as the body of `public static object Eval()`.
///
/// Pure text assembly: `content` is not validated. The `#line 1` directive
/// makes diagnostics inside the body report the user's own line numbers, and
/// the closing brace sits on its own line so a trailing `//` comment in
/// `content` cannot swallow it.
pub fn synthesize(content: &str) -> String {
    let mut script = String::with_capacity(content.len() + 48);
    script.push_str("public static object ");
    script.push_str(EVAL_FUNCTION);
    script.push_str("() {\n#line 1\n");
    script.push_str(content);
    script.push_str("\n}\n");
    script
}
