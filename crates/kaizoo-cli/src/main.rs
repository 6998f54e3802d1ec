mod cli;

use kaizoo_core::ApiError;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{e:#}"); // pretty anyhow chain
        if let Some(api) = e.downcast_ref::<ApiError>() {
            for (field, messages) in &api.fields {
                for message in messages {
                    eprintln!("  {field}: {message}");
                }
            }
            if api.is_unauthorized() {
                eprintln!("Run `kaizoo login` to sign in again.");
            }
        }
        std::process::exit(1);
    }
}
