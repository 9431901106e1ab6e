use assert_fs::prelude::*;
use predicates::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tokio::task;
use warp::Filter;

fn nwis_payload(values: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "value": {
            "timeSeries": [
                {
                    "sourceInfo": { "siteName": "OIL CREEK AT ROUSEVILLE, PA" },
                    "values": [ { "value": values } ]
                }
            ]
        }
    })
}

#[tokio::test]
async fn download_writes_processed_series_and_metadata() {
    let daily = nwis_payload(serde_json::json!([
        { "value": "120", "qualifiers": ["A"], "dateTime": "2019-11-01T00:00:00.000" },
        { "value": "-999999", "qualifiers": ["A", "e"], "dateTime": "2019-11-02T00:00:00.000" },
        { "value": "135", "qualifiers": ["A"], "dateTime": "2019-11-03T00:00:00.000" }
    ]));
    let discharge = nwis_payload(serde_json::json!([
        { "value": "118", "dateTime": "2019-11-01T00:00:00.000-05:00" },
        { "value": "119", "dateTime": "2019-11-01T00:15:00.000-05:00" },
        { "value": "121", "dateTime": "2019-11-01T00:30:00.000-05:00" }
    ]));
    let stage = nwis_payload(serde_json::json!([
        { "value": "2.50", "dateTime": "2019-11-01T00:00:00.000-05:00" },
        { "value": "2.51", "dateTime": "2019-11-01T00:15:00.000-05:00" }
    ]));

    let daily_route = warp::path("dv")
        .and(warp::get())
        .map(move || warp::reply::json(&daily));
    let instantaneous_route = warp::path("iv")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .map(move |query: HashMap<String, String>| {
            if query.get("parameterCd").map(|value| value.as_str()) == Some("00065") {
                warp::reply::json(&stage)
            } else {
                warp::reply::json(&discharge)
            }
        });
    let (addr, server) = warp::serve(daily_route.or(instantaneous_route))
        .bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    let temp = assert_fs::TempDir::new().unwrap();
    let config = temp.child("config.yaml");
    config
        .write_str(&format!(
            r#"
base_folder: {base}
gage_number: "03020500"
site_name: OilCreek
service_url: http://{addr}
available_dates:
  daily_streamflow: [2019-11-01, 2019-11-03]
  inst_streamflow: [2019-11-01, 2019-11-01]
  inst_gageheight: [2019-11-01, 2019-11-01]
"#,
            base = temp.path().display()
        ))
        .unwrap();

    let config_arg = config.path().to_str().unwrap().to_string();
    task::spawn_blocking(move || {
        let mut cmd = assert_cmd::cargo_bin_cmd!("icebreakup");
        cmd.args(["-c", &config_arg, "download"]);

        cmd.assert()
            .success()
            .stdout(predicate::str::contains("Series for gage 03020500 written"))
            .stdout(predicate::str::contains("Files written: 9"));
    })
    .await
    .unwrap();

    let project: PathBuf = temp.path().join("03020500_OilCreek");
    let daily_csv = fs::read_to_string(project.join("Daily/Qw/03020500_Daily_Qw.csv")).unwrap();
    assert_eq!(
        daily_csv,
        "Date,Discharge (cfs)\n2019-11-01,120\n2019-11-02,Ice\n2019-11-03,135\n"
    );

    let stage_csv = fs::read_to_string(project.join("Inst/Hw/03020500_Inst_Hw.csv")).unwrap();
    assert!(stage_csv.starts_with("Date & Time,Gage Height (ft)\n"));
    assert!(stage_csv.contains("2019-11-01 05:15:00,2.51"));

    let metadata: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(project.join("Inst/Qw/03020500_Inst_Qw_metadata.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(metadata["parameter_code"], "00060");
    assert_eq!(metadata["service"], "iv");
    assert_eq!(metadata["record_count"], 3);
    assert_eq!(metadata["sampling_interval_minutes"], 15);
    assert_eq!(metadata["completeness_percent"], 100.0);

    assert!(project.join("Daily/Qw/03020500_Daily_Qw_raw.json").is_file());
    assert!(project.join("Logs").is_dir());
}

#[tokio::test]
async fn failed_dataset_does_not_stop_the_others() {
    let daily = nwis_payload(serde_json::json!([
        { "value": "50", "dateTime": "2020-01-01T00:00:00.000" }
    ]));
    let daily_route = warp::path("dv")
        .and(warp::get())
        .map(move || warp::reply::json(&daily));
    let broken_route = warp::path("iv")
        .map(|| warp::reply::with_status("unavailable", warp::http::StatusCode::SERVICE_UNAVAILABLE));
    let (addr, server) =
        warp::serve(daily_route.or(broken_route)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    let temp = assert_fs::TempDir::new().unwrap();
    let config = temp.child("config.yaml");
    config
        .write_str(&format!(
            r#"
base_folder: {base}
gage_number: "03020500"
site_name: OilCreek
service_url: http://{addr}/
available_dates:
  daily_streamflow: [2020-01-01, 2020-01-01]
  inst_streamflow: [2020-01-01, 2020-01-01]
"#,
            base = temp.path().display()
        ))
        .unwrap();

    let config_arg = config.path().to_str().unwrap().to_string();
    task::spawn_blocking(move || {
        let mut cmd = assert_cmd::cargo_bin_cmd!("icebreakup");
        cmd.args(["--config", &config_arg, "download"]);

        cmd.assert()
            .success()
            .stdout(predicate::str::contains("Files written: 3"))
            .stdout(predicate::str::contains("Skipped: 2"));
    })
    .await
    .unwrap();

    let project = temp.path().join("03020500_OilCreek");
    assert!(project.join("Daily/Qw/03020500_Daily_Qw.csv").is_file());
    assert!(!project.join("Inst/Qw/03020500_Inst_Qw.csv").exists());
}
