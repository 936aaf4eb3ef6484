use colored::Colorize;
use sitestack_programs::PROGRAMS;

pub fn handle() {
    println!("{}", "Programs:".bold());
    let width = PROGRAMS.iter().map(|p| p.name.len()).max().unwrap_or(0);
    for program in PROGRAMS {
        println!(
            "  {:width$}  {:5}  {}",
            program.name.cyan(),
            program.cloud.to_string(),
            program.description,
            width = width
        );
    }
    println!();
    println!("Select one with `program \"<name>\"` in stack.kdl");
}
