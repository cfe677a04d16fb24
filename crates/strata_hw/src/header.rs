//! Items of the file header emitted ahead of the modules.

use serde::{Deserialize, Serialize};

/// One header item.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderItem {
    /// A line emitted as is.
    Verbatim(String),
    /// A conditional on whether a macro is defined.
    #[serde(rename = "ifdef")]
    IfDef {
        /// Macro tested.
        macro_name: String,
        /// Items used when the macro is defined.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        then: Vec<HeaderItem>,
        /// Items used otherwise.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        else_: Vec<HeaderItem>,
    },
}

impl HeaderItem {
    /// A verbatim line.
    pub fn verbatim(text: impl Into<String>) -> Self {
        HeaderItem::Verbatim(text.into())
    }

    /// `ifndef macro_name` holding `items`.
    pub fn ifndef(macro_name: impl Into<String>, items: Vec<HeaderItem>) -> Self {
        HeaderItem::IfDef {
            macro_name: macro_name.into(),
            then: Vec::new(),
            else_: items,
        }
    }

    /// `ifdef macro_name` with both branches.
    pub fn ifdef(macro_name: impl Into<String>, then: Vec<HeaderItem>, else_: Vec<HeaderItem>) -> Self {
        HeaderItem::IfDef {
            macro_name: macro_name.into(),
            then,
            else_,
        }
    }
}

/// Renders header items as Verilog preprocessor text.
pub fn render(items: &[HeaderItem]) -> String {
    let mut out = String::new();
    for item in items {
        render_item(item, &mut out);
    }
    out
}

fn render_item(item: &HeaderItem, out: &mut String) {
    match item {
        HeaderItem::Verbatim(text) => {
            out.push_str(text);
            out.push('\n');
        }
        HeaderItem::IfDef {
            macro_name,
            then,
            else_,
        } => {
            let (keyword, first, second): (&str, &[HeaderItem], &[HeaderItem]) =
                if then.is_empty() {
                    ("`ifndef", else_.as_slice(), &[])
                } else {
                    ("`ifdef", then.as_slice(), else_.as_slice())
                };
            out.push_str(&format!("{keyword} {macro_name}\n"));
            for item in first {
                render_item(item, out);
            }
            if !second.is_empty() {
                out.push_str("`else\n");
                for item in second {
                    render_item(item, out);
                }
            }
            out.push_str(&format!("`endif // {macro_name}\n"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_guards() {
        let items = vec![
            HeaderItem::verbatim("// header"),
            HeaderItem::ifndef("RANDOM", vec![HeaderItem::verbatim("`define RANDOM $random")]),
            HeaderItem::ifdef(
                "PRINTF_COND",
                vec![HeaderItem::verbatim("`define PRINTF_COND_ (`PRINTF_COND)")],
                vec![HeaderItem::verbatim("`define PRINTF_COND_ 1")],
            ),
        ];
        assert_eq!(
            render(&items),
            "// header\n\
             `ifndef RANDOM\n\
             `define RANDOM $random\n\
             `endif // RANDOM\n\
             `ifdef PRINTF_COND\n\
             `define PRINTF_COND_ (`PRINTF_COND)\n\
             `else\n\
             `define PRINTF_COND_ 1\n\
             `endif // PRINTF_COND\n"
        );
    }
}
