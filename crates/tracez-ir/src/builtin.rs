//! Built-in benchmark tasks.
//!
//! Each benchmark is a plain [`TaskModel`] value: listing, target line,
//! symbolic branch table and the native instrumented runner that executes it.
//! Branch-site ids and evidence locations are lines of the C listing.

use indexmap::IndexMap;

use crate::expr::Expr;
use crate::task::{BranchSite, RunnerSpec, TaskModel, VariableDecl};

pub const XOR_SOURCE: &str = include_str!("../programs/xor.c");
pub const DUMMY_SOURCE: &str = include_str!("../programs/dummy.c");
pub const CONTROL_TEMP_SOURCE: &str = include_str!("../programs/control_temp.c");

/// All built-in tasks, in registration order.
pub fn tasks() -> Vec<TaskModel> {
    vec![xor(), dummy(), control_temp()]
}

pub fn by_name(name: &str) -> Option<TaskModel> {
    match name {
        "xor" => Some(xor()),
        "dummy" => Some(dummy()),
        "control_temp" => Some(control_temp()),
        _ => None,
    }
}

fn site_table(sites: Vec<BranchSite>) -> IndexMap<u32, BranchSite> {
    sites.into_iter().map(|site| (site.id, site)).collect()
}

/// `if` on line `id` whose body starts on the following line.
fn guarded(id: u32, predicate: Expr) -> BranchSite {
    BranchSite::new(id, vec![id + 1], predicate)
}

fn native(program: &str) -> RunnerSpec {
    RunnerSpec::Native {
        program: program.to_string(),
    }
}

/// Two flags, target reached when they agree.
pub fn xor() -> TaskModel {
    let a = || Expr::var("a");
    let b = || Expr::var("b");
    let both_set = Expr::and(vec![a().eq(Expr::int(1)), b().eq(Expr::int(1))]);
    let both_clear = Expr::and(vec![a().eq(Expr::int(0)), b().eq(Expr::int(0))]);
    let same = Expr::or(vec![both_set.clone(), both_clear.clone()]);

    TaskModel {
        name: "xor".into(),
        file_name: "xor.c".into(),
        target_line: 11,
        source: XOR_SOURCE.into(),
        variables: vec![VariableDecl::bounded("a", 0, 1), VariableDecl::bounded("b", 0, 1)],
        branch_sites: site_table(vec![
            guarded(5, both_set),
            guarded(7, both_clear),
            guarded(10, same.clone()),
        ]),
        reachability_goal: same,
        runner: native("xor"),
    }
}

/// Three-way dispatch on one integer, target is the fall-through arm.
pub fn dummy() -> TaskModel {
    let is_one = Expr::var("value").eq(Expr::int(1));
    let is_two = Expr::var("value").eq(Expr::int(2));

    TaskModel {
        name: "dummy".into(),
        file_name: "dummy.c".into(),
        target_line: 8,
        source: DUMMY_SOURCE.into(),
        variables: vec![VariableDecl::int("value")],
        branch_sites: site_table(vec![guarded(3, is_one.clone()), guarded(5, is_two.clone())]),
        reachability_goal: Expr::and(vec![is_one.not(), is_two.not()]),
        runner: native("dummy"),
    }
}

/// Door controller: mode, temperature, user level and emergency override.
/// Target is the "door is open" report on line 58.
pub fn control_temp() -> TaskModel {
    let mode = || Expr::var("mode");
    let temp = || Expr::var("temp");
    let user = || Expr::var("user_level");

    // `sensorOk` is a constant in the program.
    let sensor_ok = Expr::bool(true);
    let mode_is_1 = mode().eq(Expr::int(1));
    let mode_is_2 = mode().eq(Expr::int(2));
    let temp_high = Expr::and(vec![temp().gt(Expr::int(30)), sensor_ok.clone()]);
    let user_ge_5 = user().ge(Expr::int(5));
    let user_ge_10 = user().ge(Expr::int(10));
    let temp_comfort = Expr::and(vec![
        temp().ge(Expr::int(18)),
        temp().le(Expr::int(26)),
        sensor_ok.clone(),
    ]);
    let emergency_active = Expr::var("emergency").eq(Expr::int(1));

    let open_after_mode = Expr::ite(
        mode_is_1.clone(),
        temp_high.clone(),
        Expr::ite(mode_is_2.clone(), user_ge_5.clone(), temp_comfort.clone()),
    );
    let locked_after_mode = Expr::ite(mode_is_2.clone(), user_ge_5.clone().not(), Expr::bool(false));
    let open_after_emergency = Expr::ite(
        emergency_active.clone(),
        user_ge_10.clone(),
        open_after_mode,
    );
    let locked = Expr::ite(
        emergency_active.clone(),
        Expr::ite(user_ge_10.clone(), Expr::bool(false), locked_after_mode.clone()),
        locked_after_mode,
    );
    let final_open = Expr::ite(locked.clone(), Expr::bool(false), open_after_emergency);

    TaskModel {
        name: "control_temp".into(),
        file_name: "control_temp.c".into(),
        target_line: 58,
        source: CONTROL_TEMP_SOURCE.into(),
        variables: vec![
            VariableDecl::int("mode"),
            VariableDecl::int("temp"),
            VariableDecl::int("user_level"),
            VariableDecl::bounded("emergency", 0, 1),
        ],
        branch_sites: site_table(vec![
            guarded(13, mode_is_1),
            guarded(15, temp_high),
            guarded(20, mode_is_2),
            guarded(23, user_ge_5),
            guarded(31, sensor_ok.not()),
            guarded(35, temp_comfort),
            guarded(42, emergency_active),
            guarded(44, user_ge_10),
            guarded(51, locked),
            guarded(57, final_open.clone()),
        ]),
        reachability_goal: final_open,
        runner: native("control_temp"),
    }
}
