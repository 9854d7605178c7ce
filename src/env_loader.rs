use std::env;
use std::path::PathBuf;

fn fallback_dotenv_path(
    monthsync_home: Option<PathBuf>,
    home_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    match (monthsync_home, home_dir) {
        (Some(home), _) => Some(home.join(".env")),
        (None, Some(user_home)) => Some(user_home.join(".monthsync/.env")),
        (None, None) => None,
    }
}

/// Load `.env` from the working directory, falling back to the state home.
pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("MONTHSYNC_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from),
        dirs::home_dir(),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}
