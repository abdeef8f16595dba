//! Built-in instrumented programs.
//!
//! Each program mirrors its C listing statement by statement and records the
//! listing line of every statement it executes, so branch sites and evidence
//! need no line mapping.

use tracez_ir::{Assignment, Value};

use super::{ExecutedLines, ExecutionFailure};

/// Records executed listing lines.
#[derive(Debug, Default)]
pub struct Probe {
    executed: ExecutedLines,
}

impl Probe {
    pub fn hit(&mut self, line: u32) {
        self.executed.insert(line);
    }

    pub fn into_lines(self) -> ExecutedLines {
        self.executed
    }
}

type NativeProgram = fn(&Inputs<'_>, &mut Probe) -> Result<(), ExecutionFailure>;

/// Whether a built-in program named `name` exists.
pub fn is_known(name: &str) -> bool {
    lookup(name).is_some()
}

fn lookup(name: &str) -> Option<NativeProgram> {
    let program: NativeProgram = match name {
        "xor" => xor,
        "dummy" => dummy,
        "control_temp" => control_temp,
        _ => return None,
    };
    Some(program)
}

pub fn run(program: &str, witness: &Assignment) -> Result<ExecutedLines, ExecutionFailure> {
    let entry = lookup(program).ok_or_else(|| ExecutionFailure::UnknownProgram(program.into()))?;
    let mut probe = Probe::default();
    entry(&Inputs(witness), &mut probe)?;
    Ok(probe.into_lines())
}

struct Inputs<'a>(&'a Assignment);

impl Inputs<'_> {
    /// C-style integer argument; booleans convert to 0/1.
    fn int(&self, name: &str) -> Result<i64, ExecutionFailure> {
        match self.0.get(name) {
            Some(Value::Int(n)) => Ok(*n),
            Some(Value::Bool(b)) => Ok(i64::from(*b)),
            None => Err(ExecutionFailure::MissingValue(name.into())),
        }
    }

    fn flag(&self, name: &str) -> Result<bool, ExecutionFailure> {
        self.int(name).map(|n| n != 0)
    }
}

fn xor(inputs: &Inputs<'_>, p: &mut Probe) -> Result<(), ExecutionFailure> {
    let a = inputs.int("a")?;
    let b = inputs.int("b")?;

    p.hit(4);
    let mut same = false;
    p.hit(5);
    if a == 1 && b == 1 {
        p.hit(6);
        same = true;
    }
    p.hit(7);
    if a == 0 && b == 0 {
        p.hit(8);
        same = true;
    }
    p.hit(10);
    if same {
        p.hit(11);
    }
    Ok(())
}

fn dummy(inputs: &Inputs<'_>, p: &mut Probe) -> Result<(), ExecutionFailure> {
    let value = inputs.int("value")?;

    p.hit(3);
    if value == 1 {
        p.hit(4);
        return Ok(());
    }
    p.hit(5);
    if value == 2 {
        p.hit(6);
    } else {
        p.hit(8);
    }
    Ok(())
}

fn control_temp(inputs: &Inputs<'_>, p: &mut Probe) -> Result<(), ExecutionFailure> {
    let mode = inputs.int("mode")?;
    let temp = inputs.int("temp")?;
    let user_level = inputs.int("user_level")?;
    let emergency = inputs.flag("emergency")?;

    p.hit(5);
    let mut open = false;
    p.hit(6);
    let mut locked = false;
    p.hit(7);
    let sensor_ok = true;
    for line in 9..=11 {
        p.hit(line);
    }

    p.hit(13);
    if mode == 1 {
        p.hit(14);
        p.hit(15);
        if temp > 30 && sensor_ok {
            p.hit(16);
            open = true;
        } else {
            p.hit(18);
            open = false;
        }
    } else {
        p.hit(20);
        if mode == 2 {
            p.hit(21);
            p.hit(22);
            locked = true;
            p.hit(23);
            if user_level >= 5 {
                p.hit(24);
                open = true;
                p.hit(25);
                locked = false;
            }
        } else {
            p.hit(30);
            p.hit(31);
            if !sensor_ok {
                p.hit(32);
                p.hit(33);
                open = false;
            } else {
                p.hit(35);
                if (18..=26).contains(&temp) {
                    p.hit(36);
                    open = true;
                } else {
                    p.hit(38);
                    open = false;
                }
            }
        }
    }

    p.hit(42);
    if emergency {
        p.hit(43);
        p.hit(44);
        if user_level >= 10 {
            p.hit(45);
            open = true;
            p.hit(46);
            locked = false;
        } else {
            p.hit(48);
            open = false;
        }
    }

    p.hit(51);
    if locked {
        p.hit(52);
        p.hit(53);
        open = false;
    }
    p.hit(55);
    p.hit(56);
    p.hit(57);
    if open {
        p.hit(58);
    } else {
        p.hit(60);
    }
    p.hit(62);
    Ok(())
}
