use std::convert::Infallible;

use cangate_node::storage::ImageBackend;

/// An in-memory stand in for a flash page
#[derive(Debug, Default)]
pub struct MemBackend {
    pub image: Option<Vec<u8>>,
    pub writes: usize,
    pub fail_writes: bool,
}

impl ImageBackend for MemBackend {
    fn write_image(
        &mut self,
        reader: &mut dyn embedded_io::Read<Error = Infallible>,
        size: usize,
    ) -> bool {
        if self.fail_writes {
            return false;
        }
        let mut data = vec![0; size];
        let mut pos = 0;
        while pos < size {
            let n = reader.read(&mut data[pos..]).unwrap();
            if n == 0 {
                break;
            }
            pos += n;
        }
        data.truncate(pos);
        self.image = Some(data);
        self.writes += 1;
        true
    }

    fn read_image(&self) -> Option<&[u8]> {
        self.image.as_deref()
    }
}
