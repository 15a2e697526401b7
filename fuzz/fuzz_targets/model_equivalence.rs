#![no_main]
use libfuzzer_sys::fuzz_target;

use cordyceps_avl::model::{run_model, Op};

fuzz_target!(|ops: Vec<Op>| { run_model(ops) });
