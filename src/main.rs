fn main() -> Result<(), Box<dyn std::error::Error>> {
    monkeyking::cli::main()
}
