//! Checkpoint inspection commands.

use crawlfeed_checkpoint::{format_timestamp, Checkpoint, Slot};
use std::fs;
use std::path::Path;

/// Prints every slot of a checkpoint file.
pub fn show(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let checkpoint = read(file)?;
    print!("{}", render(&checkpoint));
    Ok(())
}

/// Checks that a checkpoint file parses.
pub fn validate(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let checkpoint = read(file)?;
    let slots = checkpoint.positions().count();
    println!("OK: {} ({slots} of {} slots set)", file.display(), Slot::ALL.len());
    Ok(())
}

fn read(file: &Path) -> Result<Checkpoint, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(file)?;
    Ok(Checkpoint::parse(&contents)?)
}

fn render(checkpoint: &Checkpoint) -> String {
    let mut out = String::new();
    for slot in Slot::ALL {
        match checkpoint.position(slot) {
            Some(position) => out.push_str(&format!(
                "{:<16} {} {}\n",
                slot.label(),
                format_timestamp(&position.time),
                position.id
            )),
            None => out.push_str(&format!("{:<16} -\n", slot.label())),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawlfeed_checkpoint::Position;
    use crawlfeed_testkit::{at, checkpoint_vectors, folder_id};
    use tempfile::tempdir;

    #[test]
    fn render_lists_all_slots() {
        let mut checkpoint = Checkpoint::new();
        checkpoint.set_position(Slot::Folder, Position::new(at(0), folder_id(1)));
        let text = render(&checkpoint);
        assert_eq!(text.lines().count(), Slot::ALL.len());
        assert!(text.contains(folder_id(1).as_str()));
    }

    #[test]
    fn validate_rejects_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.checkpoint");
        fs::write(&path, "{\"lastModified\": 3}").unwrap();
        assert!(validate(&path).is_err());

        fs::write(&path, "{}").unwrap();
        assert!(validate(&path).is_ok());
    }

    #[test]
    fn validate_agrees_with_vectors() {
        let dir = tempdir().unwrap();
        for vector in checkpoint_vectors() {
            let path = dir.path().join(format!("{}.checkpoint", vector.id));
            fs::write(&path, &vector.input).unwrap();
            assert_eq!(
                validate(&path).is_err(),
                vector.must_fail(),
                "vector {}: {}",
                vector.id,
                vector.description
            );
        }
    }
}
