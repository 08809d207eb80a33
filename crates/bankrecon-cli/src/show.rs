use std::io::IsTerminal as _;

use bankrecon::ReconcileResult;
use bankrecon::report::{Styles, TextReport};

pub fn print_result(result: &ReconcileResult) {
    let styles = if std::io::stdout().is_terminal() {
        Styles::colored()
    } else {
        Styles::default()
    };

    println!("{}", TextReport::new(result, styles));
    if result.unmatched.count == 0 {
        println!("✓ All transactions match!");
    }
}
