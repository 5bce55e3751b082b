use clap::{Parser, Subcommand};
use docflow::operation::{
    CombineConfig, CompareOptions, ConvertConfig, HtmlPageConfig, HtmlSource, Operation,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "docflow")]
#[command(about = "Run document operations on the cloud document service", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $DOCFLOW_CONFIG or config/docflow.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Credentials JSON file, overrides `api.credentials_path`
    #[arg(long, global = true)]
    pub credentials: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge the PDFs in a zip archive into one PDF
    Combine {
        /// Zip archive of input PDFs
        input: PathBuf,
        #[arg(long, default_value = "output/combine/CombineResultFiles.pdf")]
        output: PathBuf,
        /// Add a table of contents
        #[arg(long)]
        toc: bool,
        #[arg(long, default_value = "1-4")]
        bookmark_levels: String,
    },

    /// Compare two PDFs
    Compare {
        base: PathBuf,
        compared: PathBuf,
        #[arg(long, default_value = "output/compare/CompareResultFiles.json")]
        output: PathBuf,
        #[arg(long, default_value = "json")]
        result_type: String,
        #[arg(long, default_value = "all")]
        compare_type: String,
    },

    /// Render a web page (URL) or an HTML file to PDF
    Html {
        /// http(s) URL or path to a local .html file
        source: String,
        #[arg(long, default_value = "output/html/CreateFromHtmlResult.pdf")]
        output: PathBuf,
        #[arg(long, default_value_t = 640)]
        width: u32,
        #[arg(long, default_value_t = 900)]
        height: u32,
    },

    /// Remove the open password from a PDF
    RemovePassword {
        input: PathBuf,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "output/removepassword/RemovePasswordResult.pdf")]
        output: PathBuf,
    },

    /// Convert a PDF to another format
    Convert {
        input: PathBuf,
        /// Target format (image, word, excel, ppt, text, html)
        #[arg(long, default_value = "image")]
        format: String,
        #[arg(long, default_value = "output/convert/ConvertResult.zip")]
        output: PathBuf,
        #[arg(long, default_value_t = 96)]
        dpi: u32,
        #[arg(long, default_value = "all")]
        page_range: String,
    },

    /// Flatten annotations and form fields
    Flatten {
        input: PathBuf,
        #[arg(long, default_value = "output/flatten/FlattenResult.pdf")]
        output: PathBuf,
        #[arg(long, default_value = "all")]
        page_range: String,
    },

    /// Extract text or images from a PDF
    Extract {
        input: PathBuf,
        /// extractText or extractImages
        #[arg(long, default_value = "extractText")]
        mode: String,
        #[arg(long)]
        page_range: Option<String>,
        #[arg(long, default_value = "output/extract/ExtractResult.txt")]
        output: PathBuf,
    },
}

impl Commands {
    /// Operation to submit and where its result goes
    pub fn into_operation(self) -> (Operation, PathBuf) {
        match self {
            Commands::Combine {
                input,
                output,
                toc,
                bookmark_levels,
            } => {
                let config = CombineConfig::builder()
                    .add_toc(toc)
                    .bookmark_levels(bookmark_levels)
                    .build();
                (Operation::combine(input, &config), output)
            }
            Commands::Compare {
                base,
                compared,
                output,
                result_type,
                compare_type,
            } => {
                let options = CompareOptions::builder()
                    .result_type(result_type)
                    .compare_type(compare_type)
                    .build();
                (Operation::compare(base, compared, &options), output)
            }
            Commands::Html {
                source,
                output,
                width,
                height,
            } => {
                let source = if source.starts_with("http://") || source.starts_with("https://") {
                    HtmlSource::Url(source)
                } else {
                    HtmlSource::File(PathBuf::from(source))
                };
                let config = HtmlPageConfig::builder().width(width).height(height).build();
                (Operation::create_from_html(&source, &config), output)
            }
            Commands::RemovePassword {
                input,
                password,
                output,
            } => (Operation::remove_password(input, password), output),
            Commands::Convert {
                input,
                format,
                output,
                dpi,
                page_range,
            } => {
                let config = ConvertConfig::builder().dpi(dpi).page_range(page_range).build();
                (Operation::convert(input, format, &config), output)
            }
            Commands::Flatten {
                input,
                output,
                page_range,
            } => (Operation::flatten(input, page_range), output),
            Commands::Extract {
                input,
                mode,
                page_range,
                output,
            } => (Operation::extract(input, mode, page_range.as_deref()), output),
        }
    }
}
