//! Model-facing prompt text.

use serde::Serialize;
use tracez_ir::TaskModel;

pub(crate) const TRACE_SYSTEM_PROMPT: &str = r#"You are a program analysis assistant. You reason about control flow in a small C program and answer with a branch trace that reaches a given target line, or with the claim that the line is unreachable.

Think first inside [THINK] ... [/THINK]. Only the text after [/THINK] is read, so never put your reasoning there.

Answer with exactly one ```trace fenced block:

```trace
answer: <reachable|unreachable>
<line-number> <T|F>
...
```

- The first line of the block is the answer line.
- Each following line is one branch decision along a single feasible path, in execution order.
- The line number refers to the numbered listing in the user message.
- `T` means the branch condition is true on the way to the target, `F` that it is false.
- For an unreachable target, output only the answer line.

Example program:
```
1: void foo(int a) {
2:     if (a > 0) {
3:         a = 0;
4:     }
5:     if (a == 0) {
6:         puts("zero");
7:     }
8: }
```

Target line 6, a reachable answer:
```trace
answer: reachable
2 T
5 T
```

An unreachable answer:
```trace
answer: unreachable
```"#;

pub(crate) fn user_prompt(task: &TaskModel) -> String {
    format!(
        "File name: {}\nTarget line: {}\n\nProgram listing:\n```\n{}\n```",
        task.file_name,
        task.target_line,
        task.numbered_listing()
    )
}

#[derive(Debug, Serialize)]
pub(crate) struct Message {
    pub(crate) role: &'static str,
    pub(crate) content: String,
}

/// System and user message of one task.
pub(crate) fn conversation(task: &TaskModel) -> Vec<Message> {
    vec![
        Message {
            role: "system",
            content: TRACE_SYSTEM_PROMPT.to_string(),
        },
        Message {
            role: "user",
            content: user_prompt(task),
        },
    ]
}
