//! Command-line XPath and CSS queries over XML and HTML files.

use std::fs;
use std::io::{self, Read};

use anyhow::Context;
use clap::{ArgGroup, Parser};
use ono::{Document, Searching, Value};

/// Query XML and HTML documents with XPath or CSS selectors
#[derive(Parser)]
#[command(name = "ono")]
#[command(version)]
#[command(about = "Query XML and HTML documents with XPath or CSS selectors", long_about = None)]
#[command(group(ArgGroup::new("query").required(true).args(["xpath", "css"])))]
struct Cli {
    /// Input file, or '-' for stdin
    file: String,

    /// XPath expression to evaluate
    #[arg(short = 'x', long)]
    xpath: Option<String>,

    /// CSS selector to run
    #[arg(short = 'c', long)]
    css: Option<String>,

    /// Parse the input as HTML instead of XML
    #[arg(long)]
    html: bool,

    /// Print an attribute of each match instead of its text content
    #[arg(short = 'a', long, value_name = "NAME")]
    attr: Option<String>,

    /// Print only the number of matches
    #[arg(long)]
    count: bool,
}

fn main() -> std::process::ExitCode {
    match run(Cli::parse()) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let content = read_input(&cli.file)?;
    let doc = if cli.html {
        Document::parse_html_bytes(&content)
    } else {
        Document::parse_xml_bytes(&content)
    }
    .with_context(|| format!("failed to parse {}", cli.file))?;

    if let Some(expression) = &cli.xpath {
        run_xpath(&doc, expression, &cli)
    } else if let Some(selector) = &cli.css {
        run_css(&doc, selector, &cli)
    } else {
        unreachable!("clap requires one of --xpath/--css")
    }
}

fn read_input(path: &str) -> anyhow::Result<Vec<u8>> {
    if path == "-" {
        let mut content = Vec::new();
        io::stdin()
            .read_to_end(&mut content)
            .context("failed to read stdin")?;
        Ok(content)
    } else {
        fs::read(path).with_context(|| format!("failed to read {path}"))
    }
}

/// Evaluates an XPath expression. Scalar results print directly; node
/// results print one match per line.
fn run_xpath(doc: &Document, expression: &str, cli: &Cli) -> anyhow::Result<()> {
    let value = doc
        .evaluate(expression)
        .with_context(|| format!("invalid XPath expression '{expression}'"))?;
    match value {
        Value::Nodes(elements) => print_elements(&elements, cli),
        Value::Strings(values) => {
            if cli.count {
                println!("{}", values.len());
            } else {
                for value in values {
                    println!("{value}");
                }
            }
            Ok(())
        }
        Value::Number(n) => {
            println!("{n}");
            Ok(())
        }
        Value::Text(text) => {
            println!("{text}");
            Ok(())
        }
        Value::Boolean(b) => {
            println!("{b}");
            Ok(())
        }
    }
}

fn run_css(doc: &Document, selector: &str, cli: &Cli) -> anyhow::Result<()> {
    let elements: Vec<_> = doc
        .css(selector)
        .with_context(|| format!("invalid CSS selector '{selector}'"))?
        .collect();
    print_elements(&elements, cli)
}

fn print_elements(elements: &[ono::Element<'_>], cli: &Cli) -> anyhow::Result<()> {
    if cli.count {
        println!("{}", elements.len());
        return Ok(());
    }
    for element in elements {
        match &cli.attr {
            Some(name) => {
                if let Some(value) = element.attribute(name) {
                    println!("{value}");
                }
            }
            None => println!("{}", element.string_value()),
        }
    }
    Ok(())
}
