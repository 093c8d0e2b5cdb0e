use std::fs;
use std::path::{Path, PathBuf};

use olympic_explorer::config::{AgeGrouping, AthleteView, DashboardConfig, Region};
use olympic_explorer::dashboard::{Page, PageReport, SectionData};
use olympic_explorer::data::filter::{FilterContext, MatchMode};
use olympic_explorer::data::model::Value;
use olympic_explorer::data::schema::TableKind;
use olympic_explorer::export;
use olympic_explorer::session::Session;

const FILES: &[(&str, &str)] = &[
    (
        "nocs.csv",
        "code,country,country_long
FRA,France,France
KEN,Kenya,Kenya
JPN,Japan,Japan
",
    ),
    (
        "continents.csv",
        "country_code,continent
FRA,Europe
KEN,Africa
JPN,Asia
",
    ),
    (
        "athletes.csv",
        "name,gender,country_code,disciplines,birth_date
Marie,Female,FRA,['Judo'],1995-03-12
Kip,Male,KEN,\"['Athletics', 'Cycling Road']\",1990-01-01
Yui,Female,JPN,['Judo'],2000-07-26
",
    ),
    (
        "medals.csv",
        "medal_type,name,discipline,country_code
Gold Medal,Marie,Judo,FRA
Silver Medal,Yui,Judo,JPN
Gold Medal,Kip,Athletics,KEN
Bronze Medal,Team FRA,Cycling Road,FRA
",
    ),
    (
        "medallists.csv",
        "name,medal_type,country_code,discipline,is_medallist
Marie,Gold Medal,FRA,Judo,True
Yui,Silver Medal,JPN,Judo,True
Kip,Gold Medal,KEN,Athletics,True
Kip,Bronze Medal,KEN,Cycling Road,True
Sam,,FRA,Rowing,False
",
    ),
    (
        "medals_total.csv",
        "country_code,Gold Medal,Silver Medal,Bronze Medal,Total
FRA,1,0,1,2
KEN,1,0,0,1
JPN,0,1,0,1
",
    ),
    (
        "events.csv",
        "event,sport
Men -60kg,Judo
Women 100m,Athletics
Road Race,Cycling Road
",
    ),
    (
        "venues.csv",
        "venue,sports,date_start,date_end
Champ-de-Mars Arena,\"['Judo', 'Wrestling']\",2024-07-27 09:00:00,2024-08-10 18:00:00
Stade de France,['Athletics'],2024-08-01 09:00:00,2024-08-11 22:00:00
Pont Alexandre III,\"['Cycling Road', 'Triathlon']\",2024-08-03 11:00:00,2024-08-04 17:00:00
",
    ),
    (
        "venue_coords.csv",
        "venue,latitude,longitude
Champ-de-Mars Arena,48.8554,2.2946
Stade de France,48.9244,2.3601
",
    ),
];

fn write_fixture(dir: &Path) -> DashboardConfig {
    for (name, content) in FILES {
        fs::write(dir.join(name), content).unwrap();
    }
    DashboardConfig {
        data_dir: dir.to_path_buf(),
        venue_coords: Some(PathBuf::from("venue_coords.csv")),
        continents: Some(PathBuf::from("continents.csv")),
        ..Default::default()
    }
}

fn render(page: Page, filters: &FilterContext) -> PageReport {
    render_athletes_with(page, filters, AthleteView::default())
}

fn render_athletes_with(page: Page, filters: &FilterContext, view: AthleteView) -> PageReport {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_fixture(dir.path());
    config.athletes = view;
    let session = Session::load(&config).unwrap();
    page.render(&session, filters, &config)
}

fn age_groups(report: &PageReport) -> Vec<(String, usize)> {
    match &report.section("Athlete Age Distribution").unwrap().data {
        SectionData::Distribution(d) => d
            .groups
            .iter()
            .map(|(k, xs)| (k.to_string(), xs.len()))
            .collect(),
        other => panic!("expected distribution, got {other:?}"),
    }
}

fn flat(report: &PageReport, title: &str) -> Vec<(String, f64)> {
    match &report.section(title).unwrap().data {
        SectionData::Flat(f) => f.entries.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        other => panic!("{title}: expected flat data, got {other:?}"),
    }
}

fn rows(report: &PageReport, title: &str) -> Vec<Vec<Value>> {
    match &report.section(title).unwrap().data {
        SectionData::Rows { rows, .. } => rows.clone(),
        other => panic!("{title}: expected rows, got {other:?}"),
    }
}

fn empty_message(report: &PageReport, title: &str) -> String {
    match &report.section(title).unwrap().data {
        SectionData::Empty { message } => message.clone(),
        other => panic!("{title}: expected placeholder, got {other:?}"),
    }
}

#[test]
fn session_normalizes_and_joins_the_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path());
    let session = Session::load(&config).unwrap();

    assert!(!session.is_loaded(TableKind::Teams));
    assert!(session.table(TableKind::Teams).is_empty());

    let athletes = session.table(TableKind::Athletes);
    let yui = &athletes.records[2];
    assert_eq!(yui.get("age"), Some(&Value::Integer(24)));
    assert_eq!(yui.get("continent"), Some(&Value::from("Asia")));
    assert_eq!(yui.get("main_sport"), Some(&Value::from("Judo")));
    assert_eq!(
        athletes.records[1].get("sport"),
        Some(&Value::List(vec!["Athletics".into(), "Cycling Road".into()]))
    );

    let medals = session.table(TableKind::Medals);
    assert_eq!(medals.options("medal_type"), vec!["Bronze", "Gold", "Silver"]);
    assert_eq!(medals.records[0].get("country"), Some(&Value::from("France")));

    let venues = session.table(TableKind::Venues);
    assert_eq!(
        venues.records[0].get("date_start"),
        Some(&Value::Date("2024-07-27".into()))
    );
    assert!(venues.records[2].get("latitude").is_none());
}

#[test]
fn overview_reports_kpis_and_standings() {
    let report = render(Page::Overview, &FilterContext::new());
    assert_eq!(report.title, "Paris 2024 Olympics Dashboard");

    let SectionData::Metrics { metrics } = &report.section("Key Performance Indicators").unwrap().data
    else {
        panic!("expected metrics");
    };
    let metric = |label: &str| metrics.iter().find(|m| m.label == label).unwrap().clone();
    assert_eq!(metric("Total Athletes").value, 3.0);
    assert_eq!(metric("Total Athletes").of, Some(3.0));
    assert_eq!(metric("Total Countries").value, 3.0);
    assert_eq!(metric("Total Sports").value, 3.0);
    assert_eq!(metric("Total Medals").value, 4.0);
    assert_eq!(metric("Number of Events").value, 3.0);

    assert_eq!(
        flat(&report, "Global Medal Distribution"),
        vec![("Gold".into(), 2.0), ("Silver".into(), 1.0), ("Bronze".into(), 1.0)]
    );
    assert_eq!(
        flat(&report, "Top Medal Standings"),
        vec![("France".into(), 2.0), ("Kenya".into(), 1.0), ("Japan".into(), 1.0)]
    );
}

#[test]
fn filtered_overview_counts_only_the_selection() {
    let filters = FilterContext::new().with("country", ["Kenya"]);
    let report = render(Page::Overview, &filters);
    let SectionData::Metrics { metrics } = &report.sections[0].data else {
        panic!("expected metrics");
    };
    assert_eq!(metrics[0].value, 1.0);
    assert_eq!(metrics[0].of, Some(3.0));
    assert_eq!(flat(&report, "Top Medal Standings"), vec![("Kenya".into(), 1.0)]);
}

#[test]
fn global_analysis_by_continent() {
    let filters = FilterContext::new().with("continent", ["Europe"]);
    let report = render(Page::GlobalAnalysis, &filters);

    assert_eq!(flat(&report, "World Medal Map"), vec![("FRA".into(), 2.0)]);
    let SectionData::Crosstab(table) = &report.section("Continent vs. Medals").unwrap().data else {
        panic!("expected crosstab");
    };
    assert_eq!(table.cell("Europe", "Gold"), Some(1.0));
    assert_eq!(table.cell("Europe", "Silver"), Some(0.0));
    assert_eq!(table.cell("Europe", "Bronze"), Some(1.0));

    let SectionData::Hierarchy(tree) = &report.section("Medal Hierarchy by Continent").unwrap().data
    else {
        panic!("expected hierarchy");
    };
    assert_eq!(tree.total(), 2.0);
    assert_eq!(tree.node(&["Europe", "France", "Judo", "Gold"]).unwrap().value, 1.0);
}

#[test]
fn global_analysis_with_no_match_shows_one_placeholder() {
    let filters = FilterContext::new().with("country", ["Atlantis"]);
    let report = render(Page::GlobalAnalysis, &filters);
    assert_eq!(report.sections.len(), 1);
    assert_eq!(
        empty_message(&report, "Global Analysis"),
        "No data for the current filter selection."
    );
}

#[test]
fn sports_events_use_exact_tokens_by_default() {
    let judo = render(Page::SportsEvents, &FilterContext::new().with("sport", ["Judo"]));
    let schedule = rows(&judo, "Event Schedule by Venue");
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0][0], Value::from("Champ-de-Mars Arena"));
    assert_eq!(flat(&judo, "Medal Count by Sport"), vec![("Judo".into(), 2.0)]);

    let exact = render(Page::SportsEvents, &FilterContext::new().with("sport", ["Cycling"]));
    assert!(exact.section("Event Schedule by Venue").unwrap().is_empty());

    let contains = FilterContext::new()
        .with("sport", ["Cycling"])
        .with_match_mode(MatchMode::Contains);
    let loose = render(Page::SportsEvents, &contains);
    assert_eq!(rows(&loose, "Event Schedule by Venue").len(), 1);
}

#[test]
fn sports_events_ignore_non_medallists_and_missing_coordinates() {
    let report = render(Page::SportsEvents, &FilterContext::new());
    assert_eq!(
        flat(&report, "Medal Count by Sport"),
        vec![
            ("Judo".into(), 2.0),
            ("Athletics".into(), 1.0),
            ("Cycling Road".into(), 1.0),
        ]
    );
    assert_eq!(rows(&report, "Venue Map").len(), 2);
    assert_eq!(rows(&report, "Event Schedule by Venue").len(), 3);
}

#[test]
fn athlete_performance_sections() {
    let report = render(Page::AthletePerformance, &FilterContext::new());

    assert_eq!(
        flat(&report, "Gender Distribution"),
        vec![("Female".into(), 2.0), ("Male".into(), 1.0)]
    );
    assert_eq!(flat(&report, "Top Athletes by Total Medals")[0], ("Kip".into(), 2.0));

    let SectionData::Distribution(ages) = &report.section("Athlete Age Distribution").unwrap().data
    else {
        panic!("expected distribution");
    };
    assert_eq!(ages.len(), 3);
    assert_eq!(ages.groups[0].0, Value::from("Judo"));
    assert_eq!(ages.groups[0].1.len(), 2);
}

#[test]
fn athlete_page_placeholders_for_empty_selection() {
    let filters = FilterContext::new().with("gender", ["Other"]);
    let report = render(Page::AthletePerformance, &filters);
    assert_eq!(
        empty_message(&report, "Gender Distribution"),
        "No gender data available for the selected filter."
    );
    assert_eq!(
        empty_message(&report, "Athlete Age Distribution"),
        "No valid age information available to plot age distribution."
    );
}

#[test]
fn age_distribution_grouping_options() {
    let by = |group_ages_by| {
        let view = AthleteView {
            group_ages_by,
            ..Default::default()
        };
        age_groups(&render_athletes_with(
            Page::AthletePerformance,
            &FilterContext::new(),
            view,
        ))
    };

    assert_eq!(
        by(AgeGrouping::Sport),
        vec![("Judo".to_string(), 2), ("Athletics".to_string(), 1)]
    );
    assert_eq!(
        by(AgeGrouping::Gender),
        vec![("Female".to_string(), 2), ("Male".to_string(), 1)]
    );
    assert_eq!(by(AgeGrouping::All), vec![("All".to_string(), 3)]);
}

#[test]
fn gender_split_can_be_scoped_to_one_region() {
    let continent = AthleteView {
        gender_region: Some(Region::Continent("Asia".into())),
        ..Default::default()
    };
    let report = render_athletes_with(Page::AthletePerformance, &FilterContext::new(), continent);
    assert_eq!(flat(&report, "Gender Distribution"), vec![("Female".into(), 1.0)]);
    // the rest of the page keeps the page-wide selection
    assert_eq!(age_groups(&report).iter().map(|(_, n)| n).sum::<usize>(), 3);

    let country = AthleteView {
        gender_region: Some(Region::Country("Kenya".into())),
        ..Default::default()
    };
    let report = render_athletes_with(Page::AthletePerformance, &FilterContext::new(), country);
    assert_eq!(flat(&report, "Gender Distribution"), vec![("Male".into(), 1.0)]);
}

#[test]
fn profile_card_shows_one_athlete() {
    let view = AthleteView {
        profile: Some("Yui".into()),
        ..Default::default()
    };
    let report = render_athletes_with(Page::AthletePerformance, &FilterContext::new(), view.clone());
    let card = rows(&report, "Athlete Detailed Profile");
    assert_eq!(card.len(), 1);
    assert_eq!(card[0][0], Value::from("Yui"));
    assert_eq!(card[0][1], Value::from("Japan"));
    assert_eq!(card[0][4], Value::Integer(24));

    let elsewhere = FilterContext::new().with("country", ["France"]);
    let report = render_athletes_with(Page::AthletePerformance, &elsewhere, view);
    assert_eq!(
        empty_message(&report, "Athlete Detailed Profile"),
        "No athlete with that name in the current selection."
    );

    let plain = render(Page::AthletePerformance, &FilterContext::new());
    assert!(plain.section("Athlete Detailed Profile").is_none());
}

#[test]
fn reports_export_as_text_and_json() {
    for page in Page::ALL {
        let report = render(page, &FilterContext::new());
        let text = export::pretty(&report).unwrap();
        assert!(text.starts_with(&format!("== {} ==", page.title())));
        let json: serde_json::Value = serde_json::from_str(&export::to_json(&report).unwrap()).unwrap();
        assert_eq!(json["title"], page.title());
    }
}
