//! Scenarios command handler.

use folio_sim::BUILTINS;

use crate::presentation::format_catalogue;

/// Print the built-in scenario catalogue.
pub fn execute() {
    print!("{}", format_catalogue(&BUILTINS));
}
