//! Synthesis of the complete Go program from a session.

use std::fmt::Write;

use crate::session::{Collection, Session};

/// Name of the zero-effect function every bound name is passed to, so the
/// Go compiler never rejects a binding as "declared and not used".
pub const SINK_FN: &str = "replSink";

/// Render the session as a compilable source unit.
pub fn render(session: &Session) -> String {
    assemble(session, false)
}

/// Like [`render`], but every import, declaration and statement line is
/// labelled with its removal index (`p0:`, `d0:`, `s0:`). Display only.
pub fn render_annotated(session: &Session) -> String {
    assemble(session, true)
}

fn label(annotate: bool, collection: Collection, index: usize) -> String {
    if annotate {
        format!("{}{}: ", collection.letter(), index)
    } else {
        String::new()
    }
}

fn assemble(session: &Session, annotate: bool) -> String {
    let mut out = String::from("package main\n");

    for (i, pkg) in session.imports.iter().enumerate() {
        let _ = writeln!(out, "{}import \"{}\"", label(annotate, Collection::Imports, i), pkg);
    }

    for (i, decl) in session.declarations.iter().enumerate() {
        let _ = writeln!(out, "{}{}\n", label(annotate, Collection::Declarations, i), decl);
    }

    let _ = writeln!(out, "func {}(_ interface{{}}) {{}}", SINK_FN);
    out.push_str("func main() {\n");
    for (i, stmt) in session.statements.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}\t{};",
            label(annotate, Collection::Statements, i),
            stmt.render()
        );
        for name in stmt.sink_targets() {
            let _ = writeln!(out, "\t{}({});", SINK_FN, name);
        }
    }
    if let Some(trailing) = &session.trailing {
        let _ = writeln!(out, "\t{};", trailing);
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gorepl_syntax::{FragmentParser, GoParser};

    fn session_with(lines: &[&str]) -> Session {
        let mut session = Session::new();
        for line in lines {
            for node in GoParser.parse_fragment(line, 1).unwrap().into_nodes() {
                session.apply(node, false);
            }
        }
        session
    }

    #[test]
    fn test_empty_session_is_a_program() {
        assert_eq!(
            render(&Session::new()),
            "package main\nfunc replSink(_ interface{}) {}\nfunc main() {\n}\n"
        );
    }

    #[test]
    fn test_full_layout() {
        let mut session = session_with(&["func double(n int) int { return n * 2 }", "x := double(2)"]);
        session.imports.push("fmt".into());
        session.trailing = Some("fmt.Println(x)".into());

        let expected = "package main\n\
                        import \"fmt\"\n\
                        func double(n int) int { return n * 2 }\n\n\
                        func replSink(_ interface{}) {}\n\
                        func main() {\n\
                        \tx := double(2);\n\
                        \treplSink(x);\n\
                        \tfmt.Println(x);\n\
                        }\n";
        assert_eq!(render(&session), expected);
    }

    #[test]
    fn test_sink_calls_follow_each_binding() {
        let mut session = Session::new();
        for line in ["a, _, c := f()", "a += 1", "var z int"] {
            session.statements.extend(GoParser.parse_statements(line, 1).unwrap());
        }
        let source = render(&session);
        let lines: Vec<&str> = source.lines().collect();
        let start = lines.iter().position(|l| *l == "func main() {").unwrap();
        assert_eq!(
            &lines[start + 1..],
            &[
                "\ta, _, c := f();",
                "\treplSink(a);",
                "\treplSink(c);",
                "\ta += 1;",
                "\treplSink(a);",
                "\tvar z int;",
                "\treplSink(z);",
                "}",
            ]
        );
    }

    #[test]
    fn test_render_is_pure() {
        let session = session_with(&["x := 1", "y := x + 1"]);
        assert_eq!(render(&session), render(&session));
    }

    #[test]
    fn test_annotated_labels() {
        let mut session = session_with(&["type T int", "x := 1", "y := 2"]);
        session.imports.push("fmt".into());
        session.imports.push("os".into());
        let text = render_annotated(&session);
        assert!(text.contains("p0: import \"fmt\"\n"));
        assert!(text.contains("p1: import \"os\"\n"));
        assert!(text.contains("d0: type T int\n"));
        assert!(text.contains("s0: \tx := 1;\n"));
        assert!(text.contains("s1: \ty := 2;\n"));
        assert!(text.contains("\treplSink(y);\n"));
    }
}
