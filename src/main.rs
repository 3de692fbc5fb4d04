fn main() -> anyhow::Result<()> {
    focus_console_lib::run()
}
