//! Command-line front end: parse markup files, then re-serialize them or
//! report on their contents.

use std::fs;
use std::io::{self, Read, Write};
use std::process::ExitCode;

use clap::Parser;

use tagmend::encoding::{decode_lossy, decode_to_utf8, sniff_charset};
use tagmend::parser::{parse_with_options, ParseOptions, Parsed};
use tagmend::serial::{serialize, SerializeOptions};
use tagmend::tree::{Location, Node, Step};
use tagmend::Interner;

/// tagmend -- repair and re-serialize HTML/XML.
#[derive(Parser, Debug)]
#[command(name = "tagmend", version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Files to process (use `-` for stdin).
    #[arg(default_value = "-")]
    files: Vec<String>,

    /// Print parser repairs to stderr.
    #[arg(long)]
    verbose: bool,

    // -- Parsing options ---------------------------------------------------
    /// Treat the input as XML.
    #[arg(long)]
    xml: bool,

    // -- Output options ----------------------------------------------------
    /// Output in the given charset (e.g., UTF-8, ISO-8859-1).
    #[arg(long, value_name = "CHARSET", default_value = "UTF-8")]
    encode: String,

    /// Write HTML output (defaults to on for documents detected as HTML).
    #[arg(long)]
    html: bool,

    /// Prefix the output with an XML declaration naming the narrowest
    /// sufficient charset.
    #[arg(long)]
    xmldecl: bool,

    /// Reproduce unchanged constructs exactly as they appeared in the input.
    #[arg(long)]
    raw: bool,

    // -- Queries -----------------------------------------------------------
    /// Print the document title instead of the document.
    #[arg(long)]
    title: bool,

    /// Print the document's text content instead of the document.
    #[arg(long)]
    text: bool,

    /// Print the location path of every element with this name.
    #[arg(long, value_name = "NAME")]
    paths: Option<String>,
}

const EXIT_SUCCESS: u8 = 0;
const EXIT_PARSE_ERROR: u8 = 1;
const EXIT_IO_ERROR: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut interner = Interner::new();
    let mut worst_exit = EXIT_SUCCESS;

    for file in &cli.files {
        let exit = process_file(&cli, file, &mut interner);
        worst_exit = worst_exit.max(exit);
    }

    ExitCode::from(worst_exit)
}

/// Processes a single input file and returns an exit code.
fn process_file(cli: &Cli, filename: &str, interner: &mut Interner) -> u8 {
    let bytes = match read_input(filename) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("{filename}: failed to read: {e}");
            return EXIT_IO_ERROR;
        }
    };
    let text = decode_input(&bytes);

    let options = ParseOptions::default().force_xml(cli.xml);
    let parsed = match parse_with_options(&text, &options, interner) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{filename}: {e}");
            return EXIT_PARSE_ERROR;
        }
    };
    if cli.verbose {
        for diag in &parsed.diagnostics {
            eprintln!("{filename}: {diag}");
        }
    }

    let output = match render(cli, &parsed) {
        Ok(out) => out,
        Err(e) => {
            eprintln!("{filename}: {e}");
            return EXIT_PARSE_ERROR;
        }
    };
    match io::stdout().lock().write_all(&output) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("{filename}: failed to write: {e}");
            EXIT_IO_ERROR
        }
    }
}

/// Reads input from a file or stdin (when filename is `-`).
fn read_input(filename: &str) -> io::Result<Vec<u8>> {
    if filename == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        fs::read(filename)
    }
}

/// Decodes strictly when the input agrees with its declared charset,
/// otherwise lossily in the sniffed charset.
fn decode_input(bytes: &[u8]) -> String {
    decode_to_utf8(bytes).unwrap_or_else(|e| {
        let (charset, skip) = sniff_charset(bytes);
        log::debug!("{e}; decoding as {} with replacements", charset.name());
        decode_lossy(&bytes[skip..], charset)
    })
}

fn render(cli: &Cli, parsed: &Parsed) -> tagmend::Result<Vec<u8>> {
    let doc = Node::from(parsed.document.clone());
    if cli.title {
        let title = parsed
            .document
            .title()
            .map(|t| t.to_plain_string())
            .unwrap_or_default();
        return Ok(format!("{title}\n").into_bytes());
    }
    if cli.text {
        return Ok(doc.extract_text().to_plain_string().into_bytes());
    }
    if let Some(name) = &cli.paths {
        let mut out = String::new();
        for path in element_paths(&doc, name) {
            out.push_str(&path);
            out.push('\n');
        }
        return Ok(out.into_bytes());
    }
    let options = SerializeOptions::default()
        .charset(&cli.encode)
        .html_output(cli.html || (parsed.is_html && !parsed.is_xml))
        .xml_declaration(cli.xmldecl)
        .preserve_raw(cli.raw);
    serialize(&doc, &options)
}

/// Location paths of the elements named `name`, in document order.
fn element_paths(doc: &Node, name: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut pending = vec![Location::new(doc.clone())];
    while let Some(loc) = pending.pop() {
        let Some(node) = loc.node() else { continue };
        if node.as_element().is_some_and(|e| e.name().matches(name)) {
            paths.push(loc.path());
        }
        let count = isize::try_from(node.children().len()).unwrap_or(isize::MAX);
        for i in (0..count).rev() {
            pending.push(loc.get_subnode(Step::Child(i)));
        }
    }
    paths
}
