use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::{Parser, ValueEnum};
use rdfa_core::profile::{Profile, ProfileError, ProfileHandler, StaticProfiles, profile_from_xml};
use rdfa_core::{
    CachingProfileHandler, DocumentFormat, GraphSink, ProcessorGraph, RdfaParser, TermMatching,
};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// HTML, parsed leniently
    Html,
    /// XHTML, parsed as XML
    Xhtml,
    /// Any other XML host language
    Xml,
}

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Document to read, or `-` for stdin
    #[arg(value_name = "PATH")]
    input: PathBuf,

    /// Base IRI of the document (defaults to the input's file URL)
    #[arg(long)]
    base: Option<String>,

    #[arg(long, value_enum, default_value_t = Format::Html)]
    format: Format,

    /// Serve a profile from a local file, as URI=PATH
    #[arg(long = "profile", value_name = "URI=PATH", value_parser = parse_profile_mapping)]
    profiles: Vec<(String, PathBuf)>,

    /// Fall back to case-insensitive matching for terms
    #[arg(long)]
    case_insensitive_terms: bool,
}

fn parse_profile_mapping(value: &str) -> Result<(String, PathBuf), String> {
    let (uri, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected URI=PATH, got `{value}`"))?;
    Ok((uri.to_string(), PathBuf::from(path)))
}

/// Loads profiles named on the command line from disk, and the built-in
/// XHTML profile from memory.
struct FileProfileHandler {
    paths: HashMap<String, PathBuf>,
    builtin: StaticProfiles,
}

impl ProfileHandler for FileProfileHandler {
    fn load_profile(&mut self, uri: &str) -> Result<Rc<Profile>, ProfileError> {
        let Some(path) = self.paths.get(uri) else {
            return self.builtin.load_profile(uri);
        };

        tracing::debug!(uri, path = %path.display(), "loading profile");
        let document = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            uri: uri.to_string(),
            source,
        })?;
        profile_from_xml(uri, &document).map(Rc::new)
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let (content, default_base) = if args.input.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        (content, None)
    } else {
        let content = std::fs::read_to_string(&args.input)?;
        let path = std::fs::canonicalize(&args.input)?;
        (content, url::Url::from_file_path(path).ok())
    };

    let base = match (args.base, default_base) {
        (Some(base), _) => base,
        (None, Some(url)) => url.to_string(),
        (None, None) => {
            eprintln!("Error: --base is required when reading from stdin.");
            return Ok(ExitCode::FAILURE);
        }
    };
    let base_iri = oxiri::Iri::parse(base.clone()).map_err(|source| {
        rdfa_core::Error::IriParseError {
            source,
            iri: base.clone(),
        }
    })?;

    let mut profiles = CachingProfileHandler::new(FileProfileHandler {
        paths: args.profiles.into_iter().collect(),
        builtin: StaticProfiles::xhtml(),
    });
    let term_matching = if args.case_insensitive_terms {
        TermMatching::CaseInsensitiveFallback
    } else {
        TermMatching::CaseSensitive
    };

    let mut output_graph = oxrdf::Graph::new();
    let mut processor_graph = oxrdf::Graph::new();
    {
        let format = match args.format {
            Format::Html | Format::Xhtml => DocumentFormat::Xhtml,
            Format::Xml => DocumentFormat::Xml,
        };
        let mut parser = RdfaParser::new(
            base_iri,
            GraphSink::new(&mut output_graph),
            ProcessorGraph::new(&mut processor_graph),
        )
        .with_format(format)
        .with_profile_handler(&mut profiles)
        .with_term_matching(term_matching);

        let walked = match args.format {
            Format::Html => {
                let document = scraper::Html::parse_document(&content);
                rdfa_core::html::walk(&document, &mut parser);
                Ok(())
            }
            Format::Xhtml | Format::Xml => rdfa_core::xml::walk_str(&content, &mut parser),
        };
        parser.finish();
        walked?;
    }

    {
        // output any warnings/errors
        let serializer = oxttl::TurtleSerializer::new();
        let mut locked_err = std::io::stderr().lock();
        let mut writer = serializer.for_writer(&mut locked_err);
        for triple in processor_graph.iter() {
            writer.serialize_triple(triple)?;
        }

        writer.finish()?;
    }

    {
        let xhtml = rdfa_core::profile::xhtml_vocab_profile();
        let serializer = xhtml.prefix_mappings.iter().try_fold(
            oxttl::TurtleSerializer::new().with_base_iri(base)?,
            |serializer, (prefix, value)| serializer.with_prefix(prefix, value),
        )?;

        let mut locked_out = std::io::stdout().lock();
        let mut writer = serializer.for_writer(&mut locked_out);
        for triple in output_graph.iter() {
            writer.serialize_triple(triple)?;
        }

        writer.finish()?;
    }

    Ok(ExitCode::SUCCESS)
}
