/// Flat typed storage, addressable either linearly or by (x, y) in a fixed
/// raster. Holds vertex data, index data, color targets and depth targets.
/// A 1D resource is stored as a single row, so the width * height == count
/// invariant holds for both flavors.
pub struct Resource<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

impl<T: Clone + Default> Resource<T> {
    /// Allocates a 1D resource holding `count` default-initialized elements.
    pub fn new(count: usize) -> Self {
        return Self {
            data: vec![T::default(); count],
            width: count,
            height: 1,
        };
    }

    /// Allocates a 2D resource with width * height default-initialized elements.
    pub fn with_size(width: usize, height: usize) -> Self {
        return Self {
            data: vec![T::default(); width * height],
            width,
            height,
        };
    }
}

impl<T> Resource<T> {
    /// Total number of elements.
    pub fn count(&self) -> usize {
        return self.data.len();
    }

    pub fn width(&self) -> usize {
        return self.width;
    }

    pub fn height(&self) -> usize {
        return self.height;
    }

    /// Linear element access. Callers pass in-range offsets; out-of-range
    /// access panics instead of corrupting memory.
    pub fn item(&self, i: usize) -> &T {
        debug_assert!(i < self.data.len());
        return &self.data[i];
    }

    pub fn item_mut(&mut self, i: usize) -> &mut T {
        debug_assert!(i < self.data.len());
        return &mut self.data[i];
    }

    /// Raster element access, row-major with row 0 at the top.
    pub fn item_at(&self, x: usize, y: usize) -> &T {
        debug_assert!(x < self.width && y < self.height);
        return &self.data[x + y * self.width];
    }

    pub fn item_at_mut(&mut self, x: usize, y: usize) -> &mut T {
        debug_assert!(x < self.width && y < self.height);
        return &mut self.data[x + y * self.width];
    }

    /// The whole storage as a flat slice, mainly for image export.
    pub fn data(&self) -> &[T] {
        return &self.data[..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_resource_is_a_single_row() {
        let resource: Resource<u32> = Resource::new(7);
        assert_eq!(resource.count(), 7);
        assert_eq!(resource.width(), 7);
        assert_eq!(resource.height(), 1);
    }

    #[test]
    fn raster_resource_holds_width_times_height_elements() {
        let resource: Resource<f32> = Resource::with_size(4, 3);
        assert_eq!(resource.count(), 12);
        assert_eq!(resource.width() * resource.height(), resource.count());
    }

    #[test]
    fn raster_access_agrees_with_linear_access() {
        let mut resource: Resource<u32> = Resource::with_size(4, 3);
        *resource.item_at_mut(1, 2) = 42;
        assert_eq!(*resource.item(1 + 2 * 4), 42);
        assert_eq!(*resource.item_at(1, 2), 42);
    }

    #[test]
    fn elements_are_default_initialized() {
        let resource: Resource<u32> = Resource::new(5);
        assert!(resource.data().iter().all(|value| *value == 0));
    }
}
