use crate::io::error::Error;
use crate::model::chorizo::Chorizo;
use crate::model::id::ResidueId;
use crate::model::residue::Residue;
use crate::model::types::{Element, Point};
use std::io::Write;

/// Writes every residue of `chorizo` as fixed-column `ATOM`/`HETATM` records.
///
/// Valid residues are written with their template key as residue name and their matched atoms
/// in template order, so reading the text back selects the same templates. Ignored residues
/// keep their input name and observed atoms. A `TER` record closes each chain.
pub fn write_chorizo<W: Write>(writer: W, chorizo: &Chorizo) -> Result<(), Error> {
    let mut ctx = WriterContext::new(writer);

    let residues = chorizo.residues();
    for (i, residue) in residues.iter().enumerate() {
        ctx.write_residue(residue)?;

        let chain_ends = residues
            .get(i + 1)
            .is_none_or(|next| next.id().chain != residue.id().chain);
        if chain_ends {
            ctx.write_ter_record(residue)?;
        }
    }

    ctx.write_end()
}

struct WriterContext<W> {
    writer: W,
    current_serial: usize,
}

impl<W: Write> WriterContext<W> {
    fn new(writer: W) -> Self {
        Self {
            writer,
            current_serial: 1,
        }
    }

    fn write_residue(&mut self, residue: &Residue) -> Result<(), Error> {
        check_fits_columns(residue.id())?;
        let record_type = if residue.observed_atoms().first().is_some_and(|a| a.is_hetatm) {
            "HETATM"
        } else {
            "ATOM  "
        };

        match residue.template_key() {
            Some(template) => {
                for atom in residue.graph().atoms() {
                    self.write_atom_record(
                        record_type,
                        &atom.name,
                        atom.element,
                        &atom.pos,
                        template,
                        residue.id(),
                    )?;
                }
            }
            None => {
                for atom in residue.observed_atoms() {
                    self.write_atom_record(
                        record_type,
                        &atom.name,
                        atom.element,
                        &atom.pos,
                        residue.res_name(),
                        residue.id(),
                    )?;
                }
            }
        }
        Ok(())
    }

    fn write_atom_record(
        &mut self,
        record_type: &str,
        name: &str,
        element: Element,
        pos: &Point,
        res_name: &str,
        id: &ResidueId,
    ) -> Result<(), Error> {
        let atom_name = if name.len() >= 4 {
            format!("{:<4}", &name[0..4])
        } else {
            format!(" {:<3}", name)
        };

        let element_str = match element {
            Element::Unknown => "  ".to_string(),
            other => format!("{:>2}", other.symbol().to_uppercase()),
        };

        writeln!(
            self.writer,
            "{:6}{:5} {:4}{:1}{:<4}{:1}{:4}{:1}   {:8.3}{:8.3}{:8.3}{:6.2}{:6.2}          {:2}",
            record_type,
            self.current_serial % 100000,
            atom_name,
            ' ',
            truncate(res_name, 4),
            id.chain.chars().next().unwrap_or(' '),
            id.number,
            id.icode.unwrap_or(' '),
            pos.x,
            pos.y,
            pos.z,
            1.00,
            0.00,
            element_str
        )
        .map_err(|e| Error::from_io(e, None))?;

        self.current_serial += 1;
        Ok(())
    }

    fn write_ter_record(&mut self, residue: &Residue) -> Result<(), Error> {
        let id = residue.id();
        let res_name = residue.template_key().unwrap_or(residue.res_name());

        writeln!(
            self.writer,
            "TER   {:5}      {:<4}{:1}{:4}{:1}",
            self.current_serial % 100000,
            truncate(res_name, 4),
            id.chain.chars().next().unwrap_or(' '),
            id.number,
            id.icode.unwrap_or(' ')
        )
        .map_err(|e| Error::from_io(e, None))?;

        self.current_serial += 1;
        Ok(())
    }

    fn write_end(&mut self) -> Result<(), Error> {
        writeln!(self.writer, "END").map_err(|e| Error::from_io(e, None))
    }
}

/// Chain ids are one column wide and residue numbers four.
fn check_fits_columns(id: &ResidueId) -> Result<(), Error> {
    let details = if id.chain.chars().count() > 1 {
        format!("chain id '{}' is longer than one character", id.chain)
    } else if !(-999..=9999).contains(&id.number) {
        format!("residue number {} does not fit in four columns", id.number)
    } else {
        return Ok(());
    };
    Err(Error::Unrepresentable {
        residue: id.to_string(),
        details,
    })
}

fn truncate(text: &str, width: usize) -> &str {
    text.get(..width).unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::pdb::reader::read;
    use crate::ops::{ChorizoBuilder, FormalChargePreparer};
    use crate::templates;
    use crate::testing::{chain_atoms, rid};

    fn written(chorizo: &Chorizo) -> String {
        let mut buffer = Vec::new();
        write_chorizo(&mut buffer, chorizo).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn records_use_template_names_and_fixed_columns() {
        let atoms = chain_atoms("A", &[("NALA", "ALA"), ("CTYR", "TYR")], true);
        let chorizo = ChorizoBuilder::new(templates::bundled())
            .build(&atoms, FormalChargePreparer::default())
            .unwrap();

        let text = written(&chorizo);
        let first = text.lines().next().unwrap();

        assert_eq!(&first[0..6], "ATOM  ");
        assert_eq!(&first[6..11], "    1");
        assert_eq!(&first[12..16], " N  ");
        assert_eq!(&first[17..21], "NALA");
        assert_eq!(&first[21..22], "A");
        assert_eq!(&first[22..26], "   1");
        assert_eq!(&first[76..78], " N");
        assert!(text.lines().any(|l| l.starts_with("TER") && &l[17..21] == "CTYR"));
        assert_eq!(text.lines().last(), Some("END"));
    }

    #[test]
    fn ids_wider_than_their_columns_are_refused() {
        let atoms = chain_atoms("AB", &[("NGLY", "GLY"), ("CGLY", "GLY")], true);
        let chorizo = ChorizoBuilder::new(templates::bundled())
            .build(&atoms, FormalChargePreparer::default())
            .unwrap();

        let err = write_chorizo(Vec::new(), &chorizo).unwrap_err();
        assert!(matches!(err, Error::Unrepresentable { ref residue, .. } if residue == "AB:1"));
        assert!(err.to_string().contains("chain id 'AB'"));

        assert!(check_fits_columns(&ResidueId::new("A", 10000, None)).is_err());
        assert!(check_fits_columns(&ResidueId::new("A", -999, None)).is_ok());
        assert!(check_fits_columns(&ResidueId::new("", 9999, Some('B'))).is_ok());
    }

    #[test]
    fn written_atoms_read_back_identically() {
        let atoms = chain_atoms("B", &[("NGLY", "GLY"), ("SER", "SER"), ("CALA", "ALA")], true);
        let chorizo = ChorizoBuilder::new(templates::bundled())
            .build(&atoms, FormalChargePreparer::default())
            .unwrap();

        let reread = read(written(&chorizo).as_bytes()).unwrap();
        let total: usize = chorizo.residues().iter().map(|r| r.graph().len()).sum();

        assert_eq!(reread.len(), total);
        assert_eq!(reread[0].res_name, "NGLY");
        assert_eq!(reread[0].res_id, rid("B:1"));
        assert!(reread.iter().zip(1..).all(|(a, serial)| a.serial == serial));
        let original = chorizo.residues()[1].atom("OG").unwrap();
        let copy = reread.iter().find(|a| a.name == "OG").unwrap();
        assert!(nalgebra::distance(&original.pos, &copy.pos) < 1e-3);
        assert_eq!(copy.element, Element::O);
    }
}
