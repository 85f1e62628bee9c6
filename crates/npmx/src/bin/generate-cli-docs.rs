use clap::CommandFactory;
use npmx::Cli;

fn main() {
    let cli = Cli::command();
    let markdown = clap_markdown::help_markdown_command(&cli);
    println!("{markdown}");
}
