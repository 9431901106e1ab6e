use predicates::prelude::*;

#[test]
fn completions_command_outputs_bash_script() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("icebreakup");
    cmd.args(["completions", "bash"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("icebreakup"));
}

#[test]
fn completions_do_not_need_a_config_file() {
    let temp = assert_fs::TempDir::new().unwrap();

    let mut cmd = assert_cmd::cargo_bin_cmd!("icebreakup");
    cmd.current_dir(temp.path()).args(["completions", "zsh"]);

    cmd.assert().success();
}
