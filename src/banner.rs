// src/banner.rs

/// Prints the application startup banner to the console.
pub fn print_banner() {
    let banner = r#"
                     _           _
 _ __ _   _ _ __   | |__   ___ | |_
| '__| | | | '_ \  | '_ \ / _ \| __|
| |  | |_| | | | | | |_) | (_) | |_
|_|   \__,_|_| |_| |_.__/ \___/ \__|

    Run code from chat, one judge poll at a time
"#;
    println!("{}", banner);
}
