use assert_cmd::Command;
use serde_json::Value;

fn mapper() -> Command { Command::cargo_bin("payload-mapper").unwrap() }

fn stdout_lines(output: &std::process::Output) -> Vec<Value> {
    String::from_utf8(output.stdout.clone())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn map_stdin_envelope() {
    let input = r#"{"msg":{"machine_id":"M-12","total_Count":42,"batch":"B7","Flavor":"vanilla"},"metadata":{"source":"mqtt"},"msgType":"reading"}"#;
    let assert = mapper().arg("map").write_stdin(format!("{}\n", input)).assert().success();
    let lines = stdout_lines(assert.get_output());
    assert_eq!(lines.len(), 1);

    let envelope = &lines[0];
    assert_eq!(envelope["msg"]["machine_id"], "M-12");
    assert_eq!(envelope["msg"]["total_Count"], 42);
    assert_eq!(envelope["msg"]["batch"], "B7");
    assert_eq!(envelope["msg"]["Flavor"], "vanilla");
    assert!(envelope["msg"]["Timestamp"].as_str().unwrap().ends_with('Z'));
    assert_eq!(envelope["metadata"], serde_json::json!({"source": "mqtt"}));
    assert_eq!(envelope["msgType"], "reading");
}

#[test]
fn map_keeps_companions_byte_for_byte() {
    let input = r#"{"msg":{"batch":1},"metadata":{"z": 1,  "a": [1.50, "x"]},"msgType":"POST_TELEMETRY_REQUEST"}"#;
    let assert = mapper().arg("map").write_stdin(input).assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains(r#""metadata":{"z": 1,  "a": [1.50, "x"]}"#));
    assert!(stdout.contains(r#""msgType":"POST_TELEMETRY_REQUEST""#));
}

#[test]
fn map_skips_undecodable_lines() {
    let input = "garbage\n{\"msg\":{\"machine_id\":\"machine_1\"}}\n";
    let assert = mapper().arg("map").write_stdin(input).assert().success();
    let lines = stdout_lines(assert.get_output());
    assert_eq!(lines.len(), 1);
    let msg = lines[0]["msg"].as_object().unwrap();
    assert_eq!(msg.len(), 5);
    assert!(msg["Flavor"].is_null());
    assert!(msg["batch"].is_null());
}

#[test]
fn map_skips_invalid_utf8_and_keeps_going() {
    let mut input = b"{\"msg\":{\"batch\":1}}\n".to_vec();
    input.extend_from_slice(b"{\"msg\":{\"Flavor\":\"\xff\"}}\n");
    input.extend_from_slice(b"{\"msg\":{\"batch\":3}}\n");
    let assert = mapper().arg("map").write_stdin(input).assert().success();
    let lines = stdout_lines(assert.get_output());
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["msg"]["batch"], 1);
    assert_eq!(lines[1]["msg"]["batch"], 3);
}

#[test]
fn map_payload_formats() {
    let assert = mapper()
        .args(&["map", "--input-format", "payload", "--output-format", "payload"])
        .write_stdin("{\"machine_id\":\"machine_1\",\"total_Count\":9,\"batch\":0}\n")
        .assert()
        .success();
    let lines = stdout_lines(assert.get_output());
    assert_eq!(lines[0]["total_Count"], 9);
    assert!(lines[0].get("msg").is_none());
}

#[test]
fn simulate_then_map() {
    let simulated = mapper().args(&["simulate", "-n", "25", "--flavor", "honey"]).assert().success();
    let telemetry = simulated.get_output().stdout.clone();

    let assert = mapper().args(&["map", "--output-format", "payload"]).write_stdin(telemetry).assert().success();
    let lines = stdout_lines(assert.get_output());
    assert_eq!(lines.len(), 25);
    assert_eq!(lines[22]["batch"], 0);
    assert_eq!(lines[23]["batch"], 1);
    assert_eq!(lines[24]["total_Count"], 25);
    assert_eq!(lines[24]["Flavor"], "honey");
}

#[test]
fn missing_subcommand_fails() { mapper().assert().failure(); }
