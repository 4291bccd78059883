use std::fs;
use tempfile::TempDir;
use zone_consumption::config::Config;
use zone_consumption::menu::Menu;
use zone_consumption::Granularity;

const DATA: &str = "\
2008,1,1,0,0,0,10,20,30,40
2008,1,1,1,0,0,-1,25,35,45
2008,1,1,1,30,0,15,-1,35,50
2008,1,2,0,0,0,1,2,3,4
";

fn data_dir() -> (TempDir, Config) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(dir.path().join("2008.csv"), DATA).expect("Failed to write data file");

    let mut config = Config::default();
    config.data.directory = dir.path().to_path_buf();
    config.plot.output_dir = dir.path().join("plots");
    (dir, config)
}

/// Load, aggregate per day and print statistics in one session
#[test]
fn test_load_aggregate_statistics_session() {
    let (_dir, config) = data_dir();
    // load 2008.csv with drop, aggregate per day, statistics, quit
    let input = "1\n2008.csv\n3\n2\n2\n3\n5\n";

    let mut menu = Menu::new(input.as_bytes(), Vec::new(), config);
    menu.run().expect("Menu loop failed");

    let session = menu.session().clone();
    let output = String::from_utf8(menu.into_output()).expect("Output is not UTF-8");

    assert!(output.contains("Loaded 2 measurements"), "{}", output);
    assert!(output.contains("Aggregated into 2 day buckets"), "{}", output);
    assert!(output.contains("Zone 1"));
    assert!(output.contains("All"));
    assert!(output.contains("Thank you for using our program"));

    assert_eq!(session.raw().map(|m| m.len()), Some(2));
    let (view, granularity) = session.aggregated().expect("No aggregated view");
    assert_eq!(granularity, Granularity::Day);
    assert_eq!(view.len(), 2);
}

/// Empty policy answer uses the configured default
#[test]
fn test_default_policy() {
    let (_dir, mut config) = data_dir();
    config.loader.default_policy = zone_consumption::FillPolicy::ForwardFill;

    let mut menu = Menu::new("1\n2008.csv\n\n".as_bytes(), Vec::new(), config);
    menu.run().expect("Menu loop failed");

    assert_eq!(menu.session().raw().map(|m| m.len()), Some(4));
}

/// Bad filenames and choices are reported and the loop continues
#[test]
fn test_errors_return_to_prompt() {
    let (_dir, config) = data_dir();
    let input = "1\n2008.xlsx\n1\nmissing.csv\n1\n2008.csv\n7\n2\n2\n9\n5\n";

    let mut menu = Menu::new(input.as_bytes(), Vec::new(), config);
    menu.run().expect("Menu loop failed");

    assert!(menu.session().raw().is_none());
    let output = String::from_utf8(menu.into_output()).expect("Output is not UTF-8");
    assert!(output.contains("does not have a recognized extension"));
    assert!(output.contains("Not found: File 'missing.csv' does not exist"));
    assert!(output.contains("Unknown fill policy '7'"));
    assert!(output.contains("Invalid argument: No data loaded"));
    assert!(output.contains("Please pick a valid option"));
}

/// Aggregation can be cleared to return to the raw view
#[test]
fn test_clear_aggregation() {
    let (_dir, config) = data_dir();
    // forward fill, aggregate per day, then "no aggregation"
    let input = "1\n2008.csv\n1\n2\n2\n2\n5\n5\n";

    let mut menu = Menu::new(input.as_bytes(), Vec::new(), config);
    menu.run().expect("Menu loop failed");

    let session = menu.session();
    assert!(session.aggregated().is_none());
    assert_eq!(session.current().map(|m| m.len()), Some(4));
}
