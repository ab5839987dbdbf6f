use std::path::PathBuf;
use clap::Parser;
use anyhow::Result;

use aerotrack::flight::FlightRecord;
use aerotrack::markdown::ReplyCleaner;
use aerotrack::table_extract::{TableExtractor, TableFormatter};

#[derive(Parser)]
#[command(name = "extract_flights")]
#[command(about = "Pull flight maintenance rows out of saved assistant replies")]
struct Cli {
    /// Reply text or markdown file
    input: PathBuf,

    /// Output file (optional, defaults to input_flights.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also render the flights and cleaned reply as HTML for viewing
    #[arg(short, long)]
    render: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let content = tokio::fs::read_to_string(&cli.input).await?;
    println!("Read {} characters from {:?}", content.len(), cli.input);

    let extracted = TableExtractor::new().extract(&content);
    println!("{}", extracted.summary.summary());

    if extracted.has_flights() {
        println!("\n{}", TableFormatter::title_for(&extracted.flights));
        println!("{}\n", TableFormatter::new().format_flights(&extracted.flights));
    }

    let output_path = cli.output.unwrap_or_else(|| {
        let mut path = cli.input.clone();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "reply".to_string());
        path.set_file_name(format!("{}_flights.json", stem));
        path
    });

    let json = serde_json::to_string_pretty(&serde_json::json!({ "flights": extracted.flights }))?;
    tokio::fs::write(&output_path, json).await?;
    println!("Wrote {} flights to {:?}", extracted.flights.len(), output_path);

    if cli.render {
        let mut html_path = output_path.clone();
        html_path.set_extension("html");

        let leftover = ReplyCleaner::new().clean(&extracted.leftover_text);
        tokio::fs::write(&html_path, render_html(&extracted.flights, &leftover)).await?;
        println!("Rendered HTML to {:?}", html_path);
    }

    Ok(())
}

fn render_html(flights: &[FlightRecord], text: &str) -> String {
    let mut markdown = String::new();
    if !flights.is_empty() {
        markdown.push_str(&format!("## {}\n\n", TableFormatter::title_for(flights)));
        markdown.push_str("| ICAO24 | Flight | Aircraft | Status | Maintenance |\n|---|---|---|---|---|\n");
        for f in flights {
            markdown.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                f.icao24,
                f.flight_number.as_deref().unwrap_or("-"),
                f.aircraft_type.as_deref().unwrap_or("-"),
                f.status,
                f.maintenance_type
            ));
        }
        markdown.push('\n');
    }
    markdown.push_str(text);

    let mut options = pulldown_cmark::Options::empty();
    options.insert(pulldown_cmark::Options::ENABLE_TABLES);
    let parser = pulldown_cmark::Parser::new_ext(&markdown, options);
    let mut html_output = String::new();
    pulldown_cmark::html::push_html(&mut html_output, parser);

    format!(r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Extracted Flights</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            max-width: 1200px;
            margin: 0 auto;
            padding: 20px;
            line-height: 1.6;
        }}
        table {{
            border-collapse: collapse;
            width: 100%;
            margin: 20px 0;
            font-size: 14px;
        }}
        th, td {{
            border: 1px solid #ddd;
            padding: 8px 12px;
            text-align: left;
        }}
        th {{
            background-color: #f2f2f2;
            font-weight: bold;
        }}
        tr:nth-child(even) {{
            background-color: #f9f9f9;
        }}
    </style>
</head>
<body>
{}
</body>
</html>"#, html_output)
}
