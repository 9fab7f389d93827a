use crate::heap::Heap;
use crate::value::{ObjId, Object};

/// Render an object to text.
///
/// Pairs print as `(car cdr)` where any parentheses inside the rendered car
/// and cdr are removed first, so nested lists come out flattened:
/// `(1 (2 3))` prints as `(1 2 3)`.
pub fn render(id: ObjId, heap: &Heap) -> String {
    render_inner(id, heap, 0)
}

fn render_inner(id: ObjId, heap: &Heap, depth: usize) -> String {
    if depth > 1000 {
        return "...".to_string();
    }

    match heap.get(id) {
        None => format!("#<free {}>", id.0),
        Some(Object::Nil) | Some(Object::Void) => String::new(),
        Some(Object::Integer(n)) => n.to_string(),
        Some(Object::Bool(true)) => "T".to_string(),
        Some(Object::Bool(false)) => "F".to_string(),
        Some(Object::Symbol(name)) => name.clone(),
        Some(Object::Function { .. }) => "func".to_string(),
        Some(Object::Syntax { .. }) => "syntax".to_string(),
        Some(Object::Cons { car, cdr }) => {
            let car = strip_parens(&render_inner(*car, heap, depth + 1));
            let cdr = strip_parens(&render_inner(*cdr, heap, depth + 1));
            format!("({} {})", car, cdr)
        }
    }
}

fn strip_parens(text: &str) -> String {
    text.replace(['(', ')'], "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(heap: &mut Heap, object: Object) -> ObjId {
        heap.place(object).unwrap()
    }

    fn cons(heap: &mut Heap, car: ObjId, cdr: ObjId) -> ObjId {
        place(heap, Object::Cons { car, cdr })
    }

    #[test]
    fn atoms() {
        let mut heap = Heap::new(16, 16);
        let ids = [
            place(&mut heap, Object::Nil),
            place(&mut heap, Object::Void),
            place(&mut heap, Object::Integer(-12)),
            place(&mut heap, Object::Bool(true)),
            place(&mut heap, Object::Bool(false)),
            place(&mut heap, Object::Symbol("foo".into())),
        ];
        let out: Vec<_> = ids.iter().map(|&id| render(id, &heap)).collect();
        assert_eq!(out, vec!["", "", "-12", "T", "F", "foo"]);
    }

    #[test]
    fn nested_lists_are_flattened() {
        let mut heap = Heap::new(16, 16);
        let nil = place(&mut heap, Object::Nil);
        let one = place(&mut heap, Object::Integer(1));
        let two = place(&mut heap, Object::Integer(2));
        let three = place(&mut heap, Object::Integer(3));

        // (2 3)
        let l3 = cons(&mut heap, three, nil);
        let inner = cons(&mut heap, two, l3);
        assert_eq!(render(inner, &heap), "(2 3)");

        // (1 (2 3))
        let tail = cons(&mut heap, inner, nil);
        let outer = cons(&mut heap, one, tail);
        assert_eq!(render(outer, &heap), "(1 2 3)");

        // ((2 3) 1)
        let l1 = cons(&mut heap, one, nil);
        let head_nested = cons(&mut heap, inner, l1);
        assert_eq!(render(head_nested, &heap), "(2 3 1)");
    }

    #[test]
    fn single_element_list_keeps_trailing_space() {
        let mut heap = Heap::new(4, 4);
        let nil = place(&mut heap, Object::Nil);
        let one = place(&mut heap, Object::Integer(1));
        let l = cons(&mut heap, one, nil);
        assert_eq!(render(l, &heap), "(1 )");
    }

    #[test]
    fn dotted_pair() {
        let mut heap = Heap::new(4, 4);
        let a = place(&mut heap, Object::Integer(1));
        let b = place(&mut heap, Object::Integer(2));
        let p = cons(&mut heap, a, b);
        assert_eq!(render(p, &heap), "(1 2)");
    }
}
