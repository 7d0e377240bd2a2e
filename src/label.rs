use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Label {
    #[default]
    Empty,
    Fluid,
    Solid,
    /// Empty cell that received a value from an extrapolation pass.
    Extrapolated,
}

impl Label {
    fn glyph(self) -> char {
        match self {
            Label::Empty => 'O',
            Label::Fluid => 'F',
            Label::Solid => 'S',
            Label::Extrapolated => 'E',
        }
    }
}

/// Per-cell classification. Reads outside the grid report [`Label::Solid`].
#[derive(Clone, Debug, PartialEq)]
pub struct LabelGrid {
    width: usize,
    height: usize,
    data: Vec<Label>,
}

impl LabelGrid {
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0, "width must be > 0");
        assert!(height > 0, "height must be > 0");
        Self {
            width,
            height,
            data: vec![Label::Empty; width * height],
        }
    }

    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> Label) -> Self {
        let mut grid = Self::new(width, height);
        grid.fill_with_index(f);
        grid
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn size(&self) -> usize {
        self.width * self.height
    }

    pub fn get(&self, x: isize, y: isize) -> Label {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return Label::Solid;
        }
        self.data[y as usize * self.width + x as usize]
    }

    pub fn set(&mut self, x: usize, y: usize, label: Label) {
        debug_assert!(
            x < self.width && y < self.height,
            "({x}, {y}) outside {}x{}",
            self.width,
            self.height
        );
        self.data[y * self.width + x] = label;
    }

    pub fn is_empty(&self, x: isize, y: isize) -> bool {
        self.get(x, y) == Label::Empty
    }

    pub fn is_fluid(&self, x: isize, y: isize) -> bool {
        self.get(x, y) == Label::Fluid
    }

    pub fn is_solid(&self, x: isize, y: isize) -> bool {
        self.get(x, y) == Label::Solid
    }

    pub fn is_extrapolated(&self, x: isize, y: isize) -> bool {
        self.get(x, y) == Label::Extrapolated
    }

    /// Fluid or extrapolated: the cell holds a meaningful value.
    pub fn is_near_fluid(&self, x: isize, y: isize) -> bool {
        matches!(self.get(x, y), Label::Fluid | Label::Extrapolated)
    }

    pub fn fill(&mut self, label: Label) {
        self.data.iter_mut().for_each(|l| *l = label);
    }

    pub fn fill_with_index(&mut self, f: impl Fn(usize, usize) -> Label) {
        let width = self.width;
        for (i, label) in self.data.iter_mut().enumerate() {
            *label = f(i % width, i / width);
        }
    }

    pub fn set_solid_border(&mut self) {
        for y in 0..self.height {
            self.set(0, y, Label::Solid);
            self.set(self.width - 1, y, Label::Solid);
        }
        for x in 0..self.width {
            self.set(x, 0, Label::Solid);
            self.set(x, self.height - 1, Label::Solid);
        }
    }

    /// Returns fluid and extrapolated cells to empty, leaving solids in place.
    pub fn reset(&mut self) {
        for label in self.data.iter_mut() {
            if matches!(label, Label::Fluid | Label::Extrapolated) {
                *label = Label::Empty;
            }
        }
    }

    pub fn copy_from(&mut self, other: &Self) {
        assert_eq!(
            (self.width, self.height),
            (other.width, other.height),
            "label grid mismatch"
        );
        self.data.clone_from(&other.data);
    }

    pub fn count(&self, label: Label) -> usize {
        self.data.iter().filter(|l| **l == label).count()
    }
}

impl fmt::Display for LabelGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for y in 0..self.height {
            for x in 0..self.width {
                write!(f, "{}", self.data[y * self.width + x].glyph())?;
                if x + 1 < self.width {
                    write!(f, ",")?;
                }
            }
            if y + 1 < self.height {
                writeln!(f)?;
            }
        }
        write!(f, "]")
    }
}
